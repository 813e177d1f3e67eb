pub mod app_config;
pub mod config;
pub mod content;
pub mod directory;
pub mod editor;
pub mod gallery;
pub mod overlap;
pub mod slug;
pub mod snapshot;
mod timestamp;
pub mod wiki;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use content::{
    guide_cards, material_cards, material_tags, youtube_video_id, Guide, GuideCard, GuideKind,
    Material, MaterialCard,
};
pub use directory::{DirectoryEntry, ServerDirectory, SlugIndex};
pub use editor::{ContentDocument, EditorError};
pub use gallery::{list_gallery, GalleryImage};
pub use overlap::{compute_overlaps, recompute_all_overlaps};
pub use slug::{server_slug, wiki_slug};
pub use snapshot::{
    GuildInfo, GuildSnapshot, HistoryPoint, MemberOverlap, MemberRecord, MemberStatus,
};
pub use wiki::{WikiBounds, WikiCatalog, WikiEntity, WikiKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
