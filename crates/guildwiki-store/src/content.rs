//! Site content documents under the content directory.

use std::path::{Path, PathBuf};

use guildwiki_core::{ContentDocument, Guide, Material, WikiCatalog, WikiEntity, WikiKind};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{to_pretty_json, write_atomic, StoreError};

#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: content_dir.into(),
        }
    }

    #[must_use]
    pub fn path(&self, document: ContentDocument) -> PathBuf {
        self.dir.join(document.file_name())
    }

    /// Read a document as raw JSON records. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] when the file is not a JSON array, so
    /// callers never overwrite a document they failed to parse.
    pub async fn read_document(&self, document: ContentDocument) -> Result<Vec<Value>, StoreError> {
        let path = self.path(document);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_slice(&raw).map_err(|e| StoreError::json(&path, e))
    }

    /// Replace a document with `records`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be created or the
    /// write fails.
    pub async fn write_document(
        &self,
        document: ContentDocument,
        records: &[Value],
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.path(document);
        let bytes = to_pretty_json(&path, records)?;
        write_atomic(&path, &bytes).await
    }

    /// Load the three wiki documents.
    ///
    /// Never fails: a missing or malformed document loads as an empty list
    /// and individual malformed records are skipped, each with a warning.
    pub async fn load_wiki(&self) -> WikiCatalog {
        let mut catalog = WikiCatalog::default();
        for kind in WikiKind::ALL {
            let entities: Vec<WikiEntity> = self.load_records(kind.into()).await;
            tracing::info!(kind = %kind, count = entities.len(), "loaded wiki entities");
            catalog.set_entities(kind, entities);
        }
        catalog
    }

    pub async fn load_guides(&self) -> Vec<Guide> {
        self.load_records(ContentDocument::Guides).await
    }

    pub async fn load_materials(&self) -> Vec<Material> {
        self.load_records(ContentDocument::Materials).await
    }

    async fn load_records<T: DeserializeOwned>(&self, document: ContentDocument) -> Vec<T> {
        let path = self.path(document);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(path = %path.display(), "content document not found");
            return Vec::new();
        }
        let raw = match self.read_document(document).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read content document");
                return Vec::new();
            }
        };
        parse_records(&path, raw)
    }
}

fn parse_records<T: DeserializeOwned>(path: &Path, raw: Vec<Value>) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), index, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}
