//! One gateway connection: Hello → Identify → heartbeat + dispatch loop.

use std::collections::HashSet;
use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

use super::protocol::{
    is_fatal_close, GatewayMessage, GuildCreatePayload, HelloPayload, IdentifyPayload, OpCode,
    Presence, ReadyPayload, UnavailableGuild,
};
use super::{GatewayConfig, GatewayEvent, PresenceCache};
use crate::error::DiscordError;

/// Why a session stopped.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// The event receiver is gone; stop for good.
    Shutdown,
    /// Connection dropped or the gateway asked us to reconnect.
    Reconnect,
}

/// Dispatch bookkeeping for one session.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    /// Guilds announced by READY or already reported; a GUILD_CREATE for any
    /// other guild means the bot was just added to it.
    known_guilds: HashSet<String>,
    pub(crate) sequence: Option<u64>,
}

impl SessionState {
    /// Apply one dispatch event and return what the collector should hear.
    pub(crate) async fn handle_dispatch(
        &mut self,
        event: &str,
        data: Value,
        presence: &PresenceCache,
    ) -> Result<Option<GatewayEvent>, DiscordError> {
        match event {
            "READY" => {
                let ready: ReadyPayload = parse(event, data)?;
                self.known_guilds = ready.guilds.iter().map(|g| g.id.clone()).collect();
                tracing::info!(
                    guilds = ready.guilds.len(),
                    session_id = ready.session_id.as_deref().unwrap_or("-"),
                    "gateway: ready"
                );
                Ok(Some(GatewayEvent::Ready {
                    guild_ids: ready.guilds.into_iter().map(|g| g.id).collect(),
                }))
            }
            "GUILD_CREATE" => {
                let guild: GuildCreatePayload = parse(event, data)?;
                presence
                    .replace_guild(
                        &guild.id,
                        guild.presences.into_iter().map(|p| (p.user.id, p.status)),
                    )
                    .await;
                if self.known_guilds.insert(guild.id.clone()) {
                    tracing::info!(guild_id = %guild.id, "gateway: joined guild");
                    Ok(Some(GatewayEvent::GuildJoined { guild_id: guild.id }))
                } else {
                    Ok(None)
                }
            }
            "PRESENCE_UPDATE" => {
                let update: Presence = parse(event, data)?;
                if let Some(guild_id) = update.guild_id {
                    presence
                        .update(&guild_id, &update.user.id, update.status)
                        .await;
                }
                Ok(None)
            }
            "GUILD_DELETE" => {
                let gone: UnavailableGuild = parse(event, data)?;
                if gone.unavailable {
                    // Outage; the guild comes back with another GUILD_CREATE.
                    return Ok(None);
                }
                self.known_guilds.remove(&gone.id);
                presence.remove_guild(&gone.id).await;
                tracing::info!(guild_id = %gone.id, "gateway: removed from guild");
                Ok(Some(GatewayEvent::GuildRemoved { guild_id: gone.id }))
            }
            _ => Ok(None),
        }
    }
}

fn parse<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, DiscordError> {
    serde_json::from_value(data).map_err(|e| DiscordError::Deserialize {
        context: format!("gateway {event} payload"),
        source: e,
    })
}

async fn send_message<S>(sink: &mut S, message: &GatewayMessage) -> Result<(), DiscordError>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(message).map_err(|e| DiscordError::Deserialize {
        context: "outgoing gateway frame".to_owned(),
        source: e,
    })?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

fn parse_frame(text: &str) -> Result<GatewayMessage, DiscordError> {
    serde_json::from_str(text).map_err(|e| DiscordError::Deserialize {
        context: "gateway frame".to_owned(),
        source: e,
    })
}

/// Run one connection until it drops, the gateway asks for a reconnect, or
/// the event receiver is closed.
pub(crate) async fn run_session(
    config: &GatewayConfig,
    presence: &PresenceCache,
    events: &mpsc::Sender<GatewayEvent>,
) -> Result<SessionEnd, DiscordError> {
    let (socket, _) = tokio_tungstenite::connect_async(config.url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let hello: HelloPayload = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame = parse_frame(&text)?;
                if frame.op != OpCode::Hello {
                    return Err(DiscordError::Protocol(format!(
                        "expected Hello, got op {}",
                        frame.op.as_u8()
                    )));
                }
                break parse("HELLO", frame.d)?;
            }
            Some(Ok(Message::Close(frame))) => {
                let code = frame.as_ref().map_or(1000, |f| u16::from(f.code));
                return Err(DiscordError::Protocol(format!(
                    "closed before Hello (code {code})"
                )));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(SessionEnd::Reconnect),
        }
    };

    let period = Duration::from_millis(hello.heartbeat_interval.max(1));
    tracing::info!(heartbeat_ms = hello.heartbeat_interval, "gateway: hello");
    send_message(
        &mut sink,
        &GatewayMessage::identify(&IdentifyPayload::new(&config.token, config.intents)),
    )
    .await?;

    // First beat is jittered so reconnecting clients do not beat in lockstep.
    let jitter = period.mul_f64(rand::random::<f64>());
    let mut heartbeat = interval_at(Instant::now() + jitter, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut acked = true;
    let mut state = SessionState::default();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if !acked {
                    tracing::warn!("gateway: heartbeat not acknowledged, reconnecting");
                    return Ok(SessionEnd::Reconnect);
                }
                acked = false;
                send_message(&mut sink, &GatewayMessage::heartbeat(state.sequence)).await?;
            }
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((1000, String::new()));
                        if is_fatal_close(code) {
                            return Err(DiscordError::FatalClose { code, reason });
                        }
                        tracing::warn!(code, reason = %reason, "gateway: connection closed");
                        return Ok(SessionEnd::Reconnect);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(SessionEnd::Reconnect),
                };

                let message = parse_frame(&text)?;
                if let Some(seq) = message.s {
                    state.sequence = Some(seq);
                }
                match message.op {
                    OpCode::Dispatch => {
                        let Some(event) = message.t.as_deref() else {
                            continue;
                        };
                        let outcome = match state.handle_dispatch(event, message.d, presence).await {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                tracing::warn!(event, error = %e, "gateway: ignoring malformed dispatch");
                                None
                            }
                        };
                        if let Some(outcome) = outcome {
                            if events.send(outcome).await.is_err() {
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                    }
                    OpCode::Heartbeat => {
                        send_message(&mut sink, &GatewayMessage::heartbeat(state.sequence)).await?;
                    }
                    OpCode::HeartbeatAck => acked = true,
                    OpCode::Reconnect => {
                        tracing::info!("gateway: reconnect requested");
                        return Ok(SessionEnd::Reconnect);
                    }
                    OpCode::InvalidSession => {
                        tracing::warn!("gateway: session invalidated");
                        return Ok(SessionEnd::Reconnect);
                    }
                    _ => {}
                }
            }
            () = events.closed() => return Ok(SessionEnd::Shutdown),
        }
    }
}
