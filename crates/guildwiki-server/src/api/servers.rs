//! Server directory handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use guildwiki_core::{DirectoryEntry, GuildSnapshot};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ServerSummary {
    pub guild_id: String,
    /// Path segment for `/api/v1/servers/{slug}`: the slug, or the guild ID
    /// when the slug collided.
    pub slug: String,
    pub name: String,
    pub member_count: u64,
    pub online_count: u64,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ServerDetail {
    pub guild_id: String,
    pub slug: String,
    pub name: String,
    pub icon_path: Option<String>,
    pub banner_path: Option<String>,
    pub snapshot: GuildSnapshot,
}

/// `assets/<file>` document references are served under `/servers/assets/`.
fn public_asset_path(reference: Option<&str>) -> Option<String> {
    reference
        .map(|r| r.trim_start_matches('/'))
        .filter(|r| !r.is_empty())
        .map(|r| format!("/servers/{r}"))
}

impl From<DirectoryEntry<'_>> for ServerSummary {
    fn from(entry: DirectoryEntry<'_>) -> Self {
        let info = &entry.snapshot.info;
        Self {
            guild_id: entry.guild_id.to_owned(),
            slug: entry.slug.to_owned(),
            name: entry.snapshot.display_name(entry.guild_id),
            member_count: info.member_count,
            online_count: info.online_count,
            icon_url: public_asset_path(info.icon_url.as_deref()),
            banner_url: public_asset_path(info.banner_url.as_deref()),
        }
    }
}

/// GET /api/v1/servers: every loaded guild, sorted by lower-cased name.
pub(super) async fn list_servers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<ServerSummary>>> {
    let servers = state
        .directory
        .sorted_by_name()
        .into_iter()
        .map(ServerSummary::from)
        .collect();
    ApiResponse::new(&req_id, servers)
}

/// GET /api/v1/servers/{slug}: one guild by slug or raw guild ID.
pub(super) async fn get_server(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ServerDetail>>, ApiError> {
    let Some(entry) = state.directory.resolve(&slug) else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("server '{slug}' not found"),
        ));
    };

    let info = &entry.snapshot.info;
    let detail = ServerDetail {
        guild_id: entry.guild_id.to_owned(),
        slug: entry.slug.to_owned(),
        name: entry.snapshot.display_name(entry.guild_id),
        icon_path: public_asset_path(info.icon_url.as_deref()),
        banner_path: public_asset_path(info.banner_url.as_deref()),
        snapshot: entry.snapshot.clone(),
    };
    Ok(ApiResponse::new(&req_id, detail))
}
