mod api;
mod middleware;
mod scheduler;
mod sessions;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use guildwiki_core::{AppConfig, Environment, ServerDirectory};
use guildwiki_store::{ContentStore, SnapshotStore};
use tokio::sync::{Mutex, RwLock};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_login_rate_limit, AppState},
    sessions::SessionStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = guildwiki_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let secret_key = resolve_secret_key(&config)?;
    let sessions = SessionStore::new(
        &secret_key,
        Duration::from_secs(config.admin_session_ttl_secs),
        config.admin_session_capacity,
    );
    let _scheduler = scheduler::build_scheduler(sessions.clone()).await?;

    let state = load_state(&config, sessions).await?;
    let app = build_app(state, default_login_rate_limit());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "site server listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// `SECRET_KEY` is mandatory outside development.
fn resolve_secret_key(config: &AppConfig) -> anyhow::Result<String> {
    match (&config.site_secret_key, &config.env) {
        (Some(key), _) => Ok(key.clone()),
        (None, Environment::Development) => {
            tracing::warn!("SECRET_KEY not set; using a random per-process key");
            Ok(uuid::Uuid::new_v4().simple().to_string())
        }
        (None, env) => anyhow::bail!("SECRET_KEY must be set in {env}"),
    }
}

async fn load_state(config: &AppConfig, sessions: SessionStore) -> anyhow::Result<AppState> {
    let loaded = SnapshotStore::new(&config.servers_dir).load_all().await?;
    if !loaded.skipped.is_empty() {
        tracing::warn!(
            skipped = loaded.skipped.len(),
            "some guild documents could not be loaded"
        );
    }
    let directory = ServerDirectory::from_loaded(loaded.snapshots);
    tracing::info!(servers = directory.len(), "server directory loaded");

    let content = ContentStore::new(&config.content_dir);
    let wiki = content.load_wiki().await;

    if config.admin_password.is_none() {
        tracing::warn!("ADMIN_PASSWORD not set; admin login is disabled");
    }

    Ok(AppState {
        directory: Arc::new(directory),
        wiki: Arc::new(RwLock::new(wiki)),
        content,
        write_lock: Arc::new(Mutex::new(())),
        sessions,
        admin_password: config.admin_password.as_deref().map(Arc::from),
        public_url: config.public_url.as_deref().map(Arc::from),
        static_dir: config.static_dir.clone(),
        assets_dir: config.assets_dir(),
        admin_static_dir: config.admin_static_dir.clone(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
