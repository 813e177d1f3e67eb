//! Guides and materials handlers.

use axum::{extract::State, Extension, Json};
use guildwiki_core::{guide_cards, material_cards, material_tags, GuideCard, MaterialCard};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct MaterialsListing {
    pub materials: Vec<MaterialCard>,
    /// `All` first, then every distinct tag sorted.
    pub tags: Vec<String>,
}

/// GET /api/v1/guides
pub(super) async fn list_guides(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<GuideCard>>> {
    let guides = state.content.load_guides().await;
    ApiResponse::new(&req_id, guide_cards(&guides))
}

/// GET /api/v1/materials
pub(super) async fn list_materials(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<MaterialsListing>> {
    let materials = state.content.load_materials().await;
    ApiResponse::new(
        &req_id,
        MaterialsListing {
            materials: material_cards(&materials),
            tags: material_tags(&materials),
        },
    )
}
