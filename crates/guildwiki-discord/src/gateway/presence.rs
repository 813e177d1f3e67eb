use std::collections::HashMap;
use std::sync::Arc;

use guildwiki_core::MemberStatus;
use tokio::sync::RwLock;

/// Per-guild member statuses fed by gateway events.
///
/// Only non-offline statuses are stored. A guild key is present once the
/// gateway delivered presence data for that guild, even if nobody is online.
#[derive(Debug, Clone, Default)]
pub struct PresenceCache {
    inner: Arc<RwLock<HashMap<String, HashMap<String, MemberStatus>>>>,
}

impl PresenceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about a guild (GUILD_CREATE).
    pub async fn replace_guild<I>(&self, guild_id: &str, presences: I)
    where
        I: IntoIterator<Item = (String, MemberStatus)>,
    {
        let statuses = presences
            .into_iter()
            .filter(|(_, status)| status.is_online())
            .collect();
        self.inner
            .write()
            .await
            .insert(guild_id.to_owned(), statuses);
    }

    /// Apply one PRESENCE_UPDATE.
    pub async fn update(&self, guild_id: &str, user_id: &str, status: MemberStatus) {
        let mut guard = self.inner.write().await;
        let guild = guard.entry(guild_id.to_owned()).or_default();
        if status.is_online() {
            guild.insert(user_id.to_owned(), status);
        } else {
            guild.remove(user_id);
        }
    }

    pub async fn remove_guild(&self, guild_id: &str) {
        self.inner.write().await.remove(guild_id);
    }

    /// Statuses for a guild, or `None` when no presence data arrived yet.
    pub async fn guild(&self, guild_id: &str) -> Option<HashMap<String, MemberStatus>> {
        self.inner.read().await.get(guild_id).cloned()
    }
}
