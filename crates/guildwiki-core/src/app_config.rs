use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Absolute base URL used in the sitemap; falls back to the request `Host`.
    pub public_url: Option<String>,
    /// Directory holding one `<guild_id>.json` per guild plus `assets/`.
    pub servers_dir: PathBuf,
    /// Directory holding the wiki/guides/materials content documents.
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub admin_static_dir: PathBuf,
    /// Maximum history points kept per guild; `0` keeps everything.
    pub history_max_points: usize,
    pub collect_interval_secs: u64,
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    pub discord_cdn_base: String,
    pub discord_gateway_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub site_secret_key: Option<String>,
    pub admin_password: Option<String>,
    pub admin_session_ttl_secs: u64,
    pub admin_session_capacity: usize,
}

impl AppConfig {
    /// Returns the bot token, failing when it is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DISCORD_TOKEN` was not set.
    pub fn require_discord_token(&self) -> Result<&str, ConfigError> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DISCORD_TOKEN".to_string()))
    }

    /// Path of the directory the collector writes icon/banner files into.
    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.servers_dir.join("assets")
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("public_url", &self.public_url)
            .field("servers_dir", &self.servers_dir)
            .field("content_dir", &self.content_dir)
            .field("static_dir", &self.static_dir)
            .field("admin_static_dir", &self.admin_static_dir)
            .field("history_max_points", &self.history_max_points)
            .field("collect_interval_secs", &self.collect_interval_secs)
            .field(
                "discord_token",
                &self.discord_token.as_ref().map(|_| "[redacted]"),
            )
            .field("discord_api_base", &self.discord_api_base)
            .field("discord_cdn_base", &self.discord_cdn_base)
            .field("discord_gateway_url", &self.discord_gateway_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field(
                "site_secret_key",
                &self.site_secret_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[redacted]"),
            )
            .field("admin_session_ttl_secs", &self.admin_session_ttl_secs)
            .field("admin_session_capacity", &self.admin_session_capacity)
            .finish()
    }
}
