pub mod client;
pub mod error;
pub mod gateway;
mod rate_limit;
pub mod snowflake;
pub mod types;

pub use client::DiscordClient;
pub use error::DiscordError;
pub use gateway::{GatewayConfig, GatewayEvent, PresenceCache};
pub use snowflake::snowflake_timestamp;
pub use types::{Guild, GuildMember, PartialGuild, User};
