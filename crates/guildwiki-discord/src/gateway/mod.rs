//! Discord gateway client: keeps a websocket session alive, feeds the
//! [`PresenceCache`], and reports guild lifecycle events to the collector.

mod presence;
mod protocol;
mod session;

use std::time::Duration;

use tokio::sync::mpsc;

pub use presence::PresenceCache;
pub use protocol::{
    is_fatal_close, GatewayMessage, HelloPayload, IdentifyPayload, OpCode, COLLECTOR_INTENTS,
    INTENT_GUILDS, INTENT_GUILD_MEMBERS, INTENT_GUILD_PRESENCES,
};

use crate::error::DiscordError;
use session::{run_session, SessionEnd};

/// Guild lifecycle notifications sent to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A session became ready; `guild_ids` are the guilds it will stream.
    Ready { guild_ids: Vec<String> },
    /// The bot was added to a guild it did not know about.
    GuildJoined { guild_id: String },
    /// The bot was removed from a guild.
    GuildRemoved { guild_id: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Websocket URL including `?v=10&encoding=json`.
    pub url: String,
    pub token: String,
    pub intents: u64,
    /// Pause between a dropped session and the next connect.
    pub reconnect_delay: Duration,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(url: &str, token: &str) -> Self {
        Self {
            url: url.to_owned(),
            token: token.to_owned(),
            intents: COLLECTOR_INTENTS,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Keep a gateway session running until `events` is dropped.
///
/// Dropped connections, missed heartbeat acks, and server-requested
/// reconnects all start a fresh session after `reconnect_delay`.
///
/// # Errors
///
/// Returns [`DiscordError::FatalClose`] when Discord closes the socket with
/// a code that a reconnect cannot fix (bad token, disallowed intents).
pub async fn run(
    config: GatewayConfig,
    presence: PresenceCache,
    events: mpsc::Sender<GatewayEvent>,
) -> Result<(), DiscordError> {
    loop {
        match run_session(&config, &presence, &events).await {
            Ok(SessionEnd::Shutdown) => {
                tracing::info!("gateway: receiver closed, stopping");
                return Ok(());
            }
            Ok(SessionEnd::Reconnect) => {}
            Err(e @ DiscordError::FatalClose { .. }) => return Err(e),
            Err(e) => tracing::warn!(error = %e, "gateway: session failed"),
        }

        tokio::select! {
            () = tokio::time::sleep(config.reconnect_delay) => {}
            () = events.closed() => return Ok(()),
        }
        tracing::info!("gateway: reconnecting");
    }
}
