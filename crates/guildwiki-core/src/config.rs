use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "DiscordBot (https://github.com/guildwiki/guildwiki, 0.1)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Secrets are optional here; each binary checks the ones it needs at startup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("GUILDWIKI_ENV", "development"))?;

    let bind_addr = or_default("GUILDWIKI_BIND_ADDR", "0.0.0.0:5000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("GUILDWIKI_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("GUILDWIKI_LOG_LEVEL", "info");
    let public_url = optional("GUILDWIKI_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string());

    let servers_dir = PathBuf::from(or_default("GUILDWIKI_SERVERS_DIR", "./servers"));
    let content_dir = PathBuf::from(or_default("GUILDWIKI_CONTENT_DIR", "./pages_data"));
    let static_dir = PathBuf::from(or_default("GUILDWIKI_STATIC_DIR", "./static"));
    let admin_static_dir =
        PathBuf::from(or_default("GUILDWIKI_ADMIN_STATIC_DIR", "./admin_static"));

    let history_max_points = parse_usize("GUILDWIKI_HISTORY_MAX_POINTS", "43200")?;
    let collect_interval_secs = parse_u64("GUILDWIKI_COLLECT_INTERVAL_SECS", "60")?;
    if collect_interval_secs == 0 {
        return Err(invalid(
            "GUILDWIKI_COLLECT_INTERVAL_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let discord_token = optional("DISCORD_TOKEN");
    let discord_api_base = or_default("GUILDWIKI_DISCORD_API_BASE", "https://discord.com/api/v10")
        .trim_end_matches('/')
        .to_string();
    let discord_cdn_base = or_default("GUILDWIKI_DISCORD_CDN_BASE", "https://cdn.discordapp.com")
        .trim_end_matches('/')
        .to_string();
    let discord_gateway_url = or_default(
        "GUILDWIKI_DISCORD_GATEWAY_URL",
        "wss://gateway.discord.gg/?v=10&encoding=json",
    );

    let request_timeout_secs = parse_u64("GUILDWIKI_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("GUILDWIKI_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("GUILDWIKI_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = parse_u64("GUILDWIKI_RETRY_BACKOFF_BASE_SECS", "1")?;

    let site_secret_key = optional("SECRET_KEY");
    let admin_password = optional("ADMIN_PASSWORD");
    let admin_session_ttl_secs = parse_u64("GUILDWIKI_ADMIN_SESSION_TTL_SECS", "3600")?;
    let admin_session_capacity = parse_usize("GUILDWIKI_ADMIN_SESSION_CAPACITY", "64")?;
    if admin_session_capacity == 0 {
        return Err(invalid(
            "GUILDWIKI_ADMIN_SESSION_CAPACITY",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        public_url,
        servers_dir,
        content_dir,
        static_dir,
        admin_static_dir,
        history_max_points,
        collect_interval_secs,
        discord_token,
        discord_api_base,
        discord_cdn_base,
        discord_gateway_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        site_secret_key,
        admin_password,
        admin_session_ttl_secs,
        admin_session_capacity,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GUILDWIKI_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
