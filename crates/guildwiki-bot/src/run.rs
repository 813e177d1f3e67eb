//! Process-level wiring: Discord client, gateway task, and the event loop.

use std::time::Duration;

use anyhow::Context;
use guildwiki_core::AppConfig;
use guildwiki_discord::gateway::{self, GatewayConfig, GatewayEvent, PresenceCache};
use guildwiki_discord::DiscordClient;
use guildwiki_store::SnapshotStore;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::collect::{Collector, DiscordSource};

fn build_client(config: &AppConfig, token: &str) -> anyhow::Result<DiscordClient> {
    DiscordClient::new(
        &config.discord_api_base,
        &config.discord_cdn_base,
        token,
        config.request_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )
    .context("failed to build Discord client")
}

/// `guildwiki-bot collect`: one REST-only pass, then exit.
///
/// Without a gateway there is no presence data, so online counts come from
/// the approximate presence count.
pub(crate) async fn collect_once(config: &AppConfig, guild: Option<&str>) -> anyhow::Result<()> {
    let token = config.require_discord_token()?;
    let source = DiscordSource::new(build_client(config, token)?, PresenceCache::new());
    let store = SnapshotStore::new(&config.servers_dir);
    let mut collector = Collector::new(source, store, config.history_max_points);
    collector.seed().await?;

    if let Some(guild_id) = guild {
        collector
            .update_guild(guild_id)
            .await
            .with_context(|| format!("failed to update guild {guild_id}"))?;
        println!("updated guild {guild_id}");
        return Ok(());
    }

    let summary = collector.full_pass().await?;
    println!(
        "refreshed {} guilds ({} failed), wrote {} documents",
        summary.refreshed, summary.failed, summary.persisted
    );
    Ok(())
}

/// `guildwiki-bot run`: keep a gateway session open and snapshot every guild
/// on READY and then every `collect_interval_secs`.
///
/// Gateway events and timer ticks are handled one at a time, so passes never
/// overlap; a slow pass delays the next tick instead of stacking them.
pub(crate) async fn run_bot(config: &AppConfig) -> anyhow::Result<()> {
    let token = config.require_discord_token()?;
    let presence = PresenceCache::new();
    let source = DiscordSource::new(build_client(config, token)?, presence.clone());
    let store = SnapshotStore::new(&config.servers_dir);
    let mut collector = Collector::new(source, store, config.history_max_points);
    collector.seed().await?;

    let (tx, mut events) = mpsc::channel::<GatewayEvent>(64);
    let gateway_task = tokio::spawn(gateway::run(
        GatewayConfig::new(&config.discord_gateway_url, token),
        presence,
        tx,
    ));

    let period = Duration::from_secs(config.collect_interval_secs);
    let mut ticker: Option<Interval> = None;
    tracing::info!(
        interval_secs = config.collect_interval_secs,
        servers_dir = %config.servers_dir.display(),
        "collector started"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    GatewayEvent::Ready { guild_ids } => {
                        tracing::info!(guilds = guild_ids.len(), "gateway ready, running full pass");
                        run_pass(&mut collector).await;
                        if ticker.is_none() {
                            let mut interval = interval_at(Instant::now() + period, period);
                            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            ticker = Some(interval);
                        }
                    }
                    GatewayEvent::GuildJoined { guild_id } => {
                        if let Err(e) = collector.update_guild(&guild_id).await {
                            tracing::warn!(guild_id = %guild_id, error = %e, "failed to snapshot joined guild");
                        }
                    }
                    GatewayEvent::GuildRemoved { guild_id } => {
                        tracing::info!(guild_id = %guild_id, "bot removed from guild; keeping its last document");
                    }
                }
            }
            () = next_tick(&mut ticker) => run_pass(&mut collector).await,
            () = &mut shutdown => {
                gateway_task.abort();
                return Ok(());
            }
        }
    }

    // The gateway dropped its sender, which only happens when it gave up.
    match gateway_task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(anyhow::Error::new(e).context("gateway stopped")),
        Err(e) => Err(anyhow::Error::new(e).context("gateway task panicked")),
    }
}

async fn run_pass(collector: &mut Collector<DiscordSource>) {
    if let Err(e) = collector.full_pass().await {
        tracing::error!(error = %e, "collection pass failed");
    }
}

/// Wait for the next timer tick; never resolves before the first READY.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
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

    tracing::info!("received shutdown signal, stopping collector");
}
