//! On-disk guild snapshot document.
//!
//! One document per guild, stored as `<guild_id>.json`. Field order here is
//! the key order in the written JSON, and every map is a `BTreeMap`, so the
//! serialized form is stable between cycles.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Guild metadata as of the latest collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
    pub member_count: u64,
    pub online_count: u64,
    pub description: Option<String>,
    #[serde(deserialize_with = "crate::timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    pub owner_id: Option<String>,
    /// Display name of the owner, when the owner is in the fetched roster.
    pub owner: Option<String>,
    /// Relative asset reference (`assets/<id>_icon.png`), `None` until cached.
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub premium_tier: u8,
    pub premium_subscription_count: u64,
    pub features: Vec<String>,
    pub vanity_url: Option<String>,
}

/// One `{timestamp, member_count, online_count}` sample per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub member_count: u64,
    pub online_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Online,
    Idle,
    Dnd,
    #[default]
    #[serde(other)]
    Offline,
}

impl MemberStatus {
    #[must_use]
    pub fn is_online(self) -> bool {
        !matches!(self, MemberStatus::Offline)
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberStatus::Online => write!(f, "online"),
            MemberStatus::Idle => write!(f, "idle"),
            MemberStatus::Dnd => write!(f, "dnd"),
            MemberStatus::Offline => write!(f, "offline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(rename = "bot", default)]
    pub is_bot: bool,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default, deserialize_with = "crate::timestamp::deserialize_option")]
    pub joined_at: Option<DateTime<Utc>>,
}

/// Members shared with one other guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberOverlap {
    pub server_name: String,
    pub common_count: usize,
    /// Sorted ascending.
    pub common_member_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSnapshot {
    pub info: GuildInfo,
    pub history: Vec<HistoryPoint>,
    pub members: Vec<MemberRecord>,
    /// Keyed by the other guild's ID. Derived; rebuilt every pass.
    pub member_overlaps: BTreeMap<String, MemberOverlap>,
}

impl GuildSnapshot {
    /// Apply one collection cycle: append a history point, replace `info`
    /// and the roster wholesale, then enforce the history cap.
    ///
    /// `max_history == 0` keeps every point.
    pub fn record_cycle(
        &mut self,
        info: GuildInfo,
        members: Vec<MemberRecord>,
        at: DateTime<Utc>,
        max_history: usize,
    ) {
        self.history.push(HistoryPoint {
            timestamp: at,
            member_count: info.member_count,
            online_count: info.online_count,
        });
        if max_history > 0 && self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
        self.info = info;
        self.members = members;
    }

    /// IDs of every non-bot member in the current roster.
    #[must_use]
    pub fn human_member_ids(&self) -> BTreeSet<&str> {
        self.members
            .iter()
            .filter(|m| !m.is_bot)
            .map(|m| m.id.as_str())
            .collect()
    }

    /// Guild name, or a placeholder built from the ID when the name is blank.
    #[must_use]
    pub fn display_name(&self, guild_id: &str) -> String {
        if self.info.name.trim().is_empty() {
            format!("Server {guild_id}")
        } else {
            self.info.name.clone()
        }
    }
}
