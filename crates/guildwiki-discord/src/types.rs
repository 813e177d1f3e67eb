//! Discord REST payloads, trimmed to the fields the collector reads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Entry of `GET /users/@me/guilds`.
#[derive(Debug, Clone, Deserialize)]
pub struct PartialGuild {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `GET /guilds/{id}?with_counts=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub premium_tier: u8,
    #[serde(default)]
    pub premium_subscription_count: Option<u64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub vanity_url_code: Option<String>,
    #[serde(default)]
    pub approximate_member_count: Option<u64>,
    #[serde(default)]
    pub approximate_presence_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Entry of `GET /guilds/{id}/members`.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl GuildMember {
    /// Guild nickname, then global display name, then username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let user = self.user.as_ref();
        self.nick
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| user.and_then(|u| u.global_name.clone()).filter(|n| !n.is_empty()))
            .or_else(|| user.map(|u| u.username.clone()))
            .unwrap_or_default()
    }
}
