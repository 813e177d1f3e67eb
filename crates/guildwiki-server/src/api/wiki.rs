//! Wiki handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use guildwiki_core::{list_gallery, GalleryImage, WikiBounds, WikiEntity, WikiKind};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct WikiListing {
    pub organizations: Vec<WikiEntity>,
    pub persons: Vec<WikiEntity>,
    pub events: Vec<WikiEntity>,
    pub bounds: WikiBounds,
}

#[derive(Debug, Serialize)]
pub(super) struct WikiDetail {
    pub kind: WikiKind,
    pub entity: WikiEntity,
    /// Always empty for events.
    pub gallery: Vec<GalleryImage>,
}

/// GET /api/v1/wiki: every entity plus filter bounds.
pub(super) async fn list_wiki(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<WikiListing>> {
    let catalog = state.wiki.read().await;
    let listing = WikiListing {
        organizations: catalog.organizations.clone(),
        persons: catalog.persons.clone(),
        events: catalog.events.clone(),
        bounds: catalog.bounds(),
    };
    drop(catalog);
    ApiResponse::new(&req_id, listing)
}

/// GET /api/v1/wiki/{slug}: one entity by raw ID or name slug.
pub(super) async fn get_wiki_entity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<WikiDetail>>, ApiError> {
    let found = state
        .wiki
        .read()
        .await
        .find_by_slug_or_id(&slug)
        .map(|(kind, entity)| (kind, entity.clone()));

    let Some((kind, entity)) = found else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("wiki page '{slug}' not found"),
        ));
    };

    let gallery = if kind.has_gallery() {
        load_gallery(&state, kind, &entity.id).await
    } else {
        Vec::new()
    };

    Ok(ApiResponse::new(
        &req_id,
        WikiDetail {
            kind,
            entity,
            gallery,
        },
    ))
}

/// Gallery listing off the async runtime; failures degrade to no images.
async fn load_gallery(state: &AppState, kind: WikiKind, id: &str) -> Vec<GalleryImage> {
    let static_dir = state.static_dir.clone();
    let entity_id = id.to_owned();
    let listed =
        tokio::task::spawn_blocking(move || list_gallery(&static_dir, kind, &entity_id)).await;

    match listed {
        Ok(Ok(images)) => images,
        Ok(Err(e)) => {
            tracing::warn!(kind = %kind, id, error = %e, "failed to list wiki gallery");
            Vec::new()
        }
        Err(e) => {
            tracing::error!(kind = %kind, id, error = %e, "gallery task failed");
            Vec::new()
        }
    }
}
