//! Snapshot collection: one sequential owner of every guild document.
//!
//! The [`Collector`] keeps all guild snapshots in memory, refreshes them from
//! a [`GuildSource`], and rewrites the documents on disk. Per-guild failures
//! are logged and skipped so one broken guild never blocks the others.

mod discord;

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use guildwiki_core::{recompute_all_overlaps, GuildInfo, GuildSnapshot, MemberRecord};
use guildwiki_store::{AssetKind, SnapshotStore};

pub(crate) use discord::DiscordSource;

/// Everything fetched about one guild in one cycle.
#[derive(Debug, Clone)]
pub(crate) struct GuildCapture {
    /// `icon_url` / `banner_url` are filled in by the collector.
    pub info: GuildInfo,
    pub members: Vec<MemberRecord>,
    pub icon_hash: Option<String>,
    pub banner_hash: Option<String>,
}

impl GuildCapture {
    fn asset_hash(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Icon => self.icon_hash.as_deref(),
            AssetKind::Banner => self.banner_hash.as_deref(),
        }
    }
}

/// Where guild state comes from.
pub(crate) trait GuildSource {
    /// IDs of every guild the bot is currently in.
    async fn list_guild_ids(&self) -> anyhow::Result<Vec<String>>;

    async fn capture(&self, guild_id: &str) -> anyhow::Result<GuildCapture>;

    async fn download_asset(
        &self,
        guild_id: &str,
        kind: AssetKind,
        hash: &str,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Counts reported after a full pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PassSummary {
    pub refreshed: usize,
    pub failed: usize,
    pub persisted: usize,
}

pub(crate) struct Collector<S> {
    source: S,
    store: SnapshotStore,
    snapshots: BTreeMap<String, GuildSnapshot>,
    /// `(guild, kind, hash)` downloads already tried by this process.
    attempted_assets: HashSet<(String, AssetKind, String)>,
    history_cap: usize,
}

impl<S: GuildSource> Collector<S> {
    pub(crate) fn new(source: S, store: SnapshotStore, history_cap: usize) -> Self {
        Self {
            source,
            store,
            snapshots: BTreeMap::new(),
            attempted_assets: HashSet::new(),
            history_cap,
        }
    }

    /// Load existing documents so history carries over restarts.
    ///
    /// Documents that fail to parse are renamed aside first, so the next
    /// pass cannot overwrite them.
    ///
    /// # Errors
    ///
    /// Fails when the servers directory cannot be created or listed, or an
    /// unreadable document cannot be moved aside.
    pub(crate) async fn seed(&mut self) -> anyhow::Result<usize> {
        self.store.ensure_dirs().await?;
        let loaded = self.store.load_all().await?;
        for skipped in &loaded.skipped {
            let moved = self.store.set_aside(&skipped.path).await?;
            tracing::warn!(
                path = %skipped.path.display(),
                moved_to = %moved.display(),
                error = %skipped.error,
                "unreadable guild document set aside; it will be rebuilt"
            );
        }
        self.snapshots.extend(loaded.snapshots);
        tracing::info!(guilds = self.snapshots.len(), "seeded collector from disk");
        Ok(self.snapshots.len())
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self, guild_id: &str) -> Option<&GuildSnapshot> {
        self.snapshots.get(guild_id)
    }

    /// Refresh every guild the source lists, recompute overlaps across all
    /// known guilds, then persist every document.
    ///
    /// # Errors
    ///
    /// Fails only when the guild list itself cannot be fetched.
    pub(crate) async fn full_pass(&mut self) -> anyhow::Result<PassSummary> {
        let guild_ids = self.source.list_guild_ids().await?;
        let mut summary = PassSummary::default();

        for guild_id in &guild_ids {
            match self.refresh_guild(guild_id).await {
                Ok(()) => summary.refreshed += 1,
                Err(e) => {
                    tracing::warn!(guild_id = %guild_id, error = %e, "guild refresh failed; skipping");
                    summary.failed += 1;
                }
            }
        }

        recompute_all_overlaps(&mut self.snapshots);

        for (guild_id, snapshot) in &self.snapshots {
            match self.store.write(guild_id, snapshot).await {
                Ok(()) => summary.persisted += 1,
                Err(e) => {
                    tracing::error!(guild_id = %guild_id, error = %e, "failed to persist guild document");
                }
            }
        }

        tracing::info!(
            listed = guild_ids.len(),
            refreshed = summary.refreshed,
            failed = summary.failed,
            persisted = summary.persisted,
            "collection pass complete"
        );
        Ok(summary)
    }

    /// Refresh and persist a single guild without touching overlaps.
    ///
    /// # Errors
    ///
    /// Propagates capture and write failures.
    pub(crate) async fn update_guild(&mut self, guild_id: &str) -> anyhow::Result<()> {
        self.refresh_guild(guild_id).await?;
        if let Some(snapshot) = self.snapshots.get(guild_id) {
            self.store.write(guild_id, snapshot).await?;
        }
        tracing::info!(guild_id, "guild updated");
        Ok(())
    }

    async fn refresh_guild(&mut self, guild_id: &str) -> anyhow::Result<()> {
        let capture = self.source.capture(guild_id).await?;
        let mut info = capture.info.clone();
        info.icon_url = self.sync_asset(guild_id, AssetKind::Icon, &capture).await;
        info.banner_url = self.sync_asset(guild_id, AssetKind::Banner, &capture).await;

        self.snapshots.entry(guild_id.to_owned()).or_default().record_cycle(
            info,
            capture.members,
            Utc::now(),
            self.history_cap,
        );
        Ok(())
    }

    /// Make sure the asset file exists when the guild has one and return the
    /// document reference, or `None` while no file is cached.
    async fn sync_asset(
        &mut self,
        guild_id: &str,
        kind: AssetKind,
        capture: &GuildCapture,
    ) -> Option<String> {
        let hash = capture.asset_hash(kind)?;
        if self.store.asset_exists(guild_id, kind).await {
            return Some(kind.document_ref(guild_id));
        }

        let key = (guild_id.to_owned(), kind, hash.to_owned());
        if !self.attempted_assets.insert(key) {
            return None;
        }

        match self.source.download_asset(guild_id, kind, hash).await {
            Ok(bytes) => match self.store.write_asset(guild_id, kind, &bytes).await {
                Ok(()) => {
                    tracing::info!(guild_id, asset = kind.as_str(), "downloaded guild asset");
                    Some(kind.document_ref(guild_id))
                }
                Err(e) => {
                    tracing::warn!(guild_id, asset = kind.as_str(), error = %e, "failed to save guild asset");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(guild_id, asset = kind.as_str(), error = %e, "failed to download guild asset");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
