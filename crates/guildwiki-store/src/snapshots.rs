//! Guild snapshot documents (`<guild_id>.json`) and their cached assets.

use std::path::{Path, PathBuf};

use guildwiki_core::GuildSnapshot;
use uuid::Uuid;

use crate::{to_pretty_json, write_atomic, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Icon,
    Banner,
}

impl AssetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Icon => "icon",
            AssetKind::Banner => "banner",
        }
    }

    /// File name under the assets directory, e.g. `123_icon.png`.
    #[must_use]
    pub fn file_name(self, guild_id: &str) -> String {
        format!("{guild_id}_{}.png", self.as_str())
    }

    /// Reference stored in `info.icon_url` / `info.banner_url`.
    #[must_use]
    pub fn document_ref(self, guild_id: &str) -> String {
        format!("assets/{}", self.file_name(guild_id))
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A guild document that could not be loaded.
#[derive(Debug)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct LoadedSnapshots {
    /// `(guild_id, snapshot)` in file-name order.
    pub snapshots: Vec<(String, GuildSnapshot)>,
    pub skipped: Vec<SkippedDocument>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    assets_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(servers_dir: impl Into<PathBuf>) -> Self {
        let dir = servers_dir.into();
        let assets_dir = dir.join("assets");
        Self { dir, assets_dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Create the servers and assets directories if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when a directory cannot be created.
    pub async fn ensure_dirs(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.assets_dir)
            .await
            .map_err(|e| StoreError::io(&self.assets_dir, e))
    }

    #[must_use]
    pub fn document_path(&self, guild_id: &str) -> PathBuf {
        self.dir.join(format!("{guild_id}.json"))
    }

    #[must_use]
    pub fn asset_path(&self, guild_id: &str, kind: AssetKind) -> PathBuf {
        self.assets_dir.join(kind.file_name(guild_id))
    }

    /// Load every `*.json` guild document, sorted by file name.
    ///
    /// A missing directory loads as empty. Unreadable or malformed documents
    /// are logged, reported in [`LoadedSnapshots::skipped`] and otherwise
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] only when the directory exists but cannot
    /// be listed.
    pub async fn load_all(&self) -> Result<LoadedSnapshots, StoreError> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.dir.display(), "servers directory not found; no guilds loaded");
                return Ok(LoadedSnapshots::default());
            }
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut candidates: Vec<(String, PathBuf)> = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(guild_id) = name.strip_suffix(".json") else {
                continue;
            };
            if guild_id.is_empty() || !path.is_file() {
                continue;
            }
            candidates.push((guild_id.to_string(), path));
        }
        candidates.sort_by(|a, b| a.1.cmp(&b.1));

        let mut loaded = LoadedSnapshots::default();
        for (guild_id, path) in candidates {
            match read_snapshot(&path).await {
                Ok(snapshot) => {
                    tracing::debug!(guild_id = %guild_id, name = %snapshot.info.name, "loaded guild document");
                    loaded.snapshots.push((guild_id, snapshot));
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "skipping unreadable guild document");
                    loaded.skipped.push(SkippedDocument { path, error });
                }
            }
        }
        Ok(loaded)
    }

    /// Overwrite the guild document for `guild_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when serialization or the write fails.
    pub async fn write(&self, guild_id: &str, snapshot: &GuildSnapshot) -> Result<(), StoreError> {
        let path = self.document_path(guild_id);
        let bytes = to_pretty_json(&path, snapshot)?;
        write_atomic(&path, &bytes).await
    }

    /// Rename an unreadable document out of the `*.json` namespace so it is
    /// neither loaded nor overwritten, and return its new path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the rename fails.
    pub async fn set_aside(&self, path: &Path) -> Result<PathBuf, StoreError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");
        let target = path.with_file_name(format!(
            "{file_name}.unreadable-{}",
            Uuid::new_v4().simple()
        ));
        tokio::fs::rename(path, &target)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        Ok(target)
    }

    pub async fn asset_exists(&self, guild_id: &str, kind: AssetKind) -> bool {
        tokio::fs::try_exists(self.asset_path(guild_id, kind))
            .await
            .unwrap_or(false)
    }

    /// Persist downloaded asset bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the write fails.
    pub async fn write_asset(
        &self,
        guild_id: &str,
        kind: AssetKind,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        write_atomic(&self.asset_path(guild_id, kind), bytes).await
    }
}

async fn read_snapshot(path: &Path) -> Result<GuildSnapshot, StoreError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&raw).map_err(|e| StoreError::json(path, e))
}
