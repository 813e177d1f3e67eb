//! Admin login and content document editing.
//!
//! Every write is a read-modify-write of one whole document under
//! [`AppState::write_lock`]; wiki documents also refresh the in-memory
//! catalog before the lock is released.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use guildwiki_core::ContentDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::{AdminToken, RequestId};
use crate::sessions::{password_matches, IssuedSession};

use super::{map_store_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LogoutResponse {
    pub revoked: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct DocumentListing {
    pub document: &'static str,
    pub records: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub(super) struct RecordWritten {
    pub index: usize,
    pub record: Value,
}

#[derive(Debug, Serialize)]
pub(super) struct RecordDeleted {
    pub index: usize,
    pub remaining: usize,
}

/// Admin form fields, all strings.
type Form = HashMap<String, String>;

fn resolve_document(req_id: &str, name: &str) -> Result<ContentDocument, ApiError> {
    ContentDocument::from_name(name).ok_or_else(|| {
        ApiError::new(req_id, "not_found", format!("document '{name}' not found"))
    })
}

fn build_record(req_id: &str, document: ContentDocument, form: &Form) -> Result<Value, ApiError> {
    document
        .build_record(form)
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}

fn record_not_found(req_id: &str, document: ContentDocument, index: usize) -> ApiError {
    ApiError::new(
        req_id,
        "not_found",
        format!("{document} has no record at index {index}"),
    )
}

/// Write `records` back and, for wiki documents, reload the catalog.
async fn commit(
    state: &AppState,
    req_id: &str,
    document: ContentDocument,
    records: &[Value],
) -> Result<(), ApiError> {
    state
        .content
        .write_document(document, records)
        .await
        .map_err(|e| map_store_error(req_id, &e))?;

    if document.wiki_kind().is_some() {
        let catalog = state.content.load_wiki().await;
        *state.wiki.write().await = catalog;
        tracing::debug!(document = %document, "wiki catalog refreshed");
    }
    Ok(())
}

/// POST /api/v1/admin/login
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<IssuedSession>>, ApiError> {
    let Some(expected) = state.admin_password.as_deref() else {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "admin login is disabled",
        ));
    };

    if !password_matches(expected, &body.password) {
        tracing::warn!(request_id = %req_id.0, "rejected admin login");
        return Err(ApiError::new(req_id.0, "unauthorized", "invalid password"));
    }

    let session = state.sessions.issue().await;
    tracing::info!(request_id = %req_id.0, "admin session issued");
    Ok(ApiResponse::new(&req_id, session))
}

/// POST /api/v1/admin/logout
pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(token): Extension<AdminToken>,
) -> Json<ApiResponse<LogoutResponse>> {
    let revoked = state.sessions.revoke(&token.0).await;
    ApiResponse::new(&req_id, LogoutResponse { revoked })
}

/// GET /api/v1/admin/documents/{document}
pub(super) async fn list_records(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<DocumentListing>>, ApiError> {
    let rid = &req_id.0;
    let document = resolve_document(rid, &name)?;
    let records = state
        .content
        .read_document(document)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    Ok(ApiResponse::new(
        &req_id,
        DocumentListing {
            document: document.file_name(),
            records,
        },
    ))
}

/// POST /api/v1/admin/documents/{document}: append a record.
pub(super) async fn create_record(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
    Json(form): Json<Form>,
) -> Result<(StatusCode, Json<ApiResponse<RecordWritten>>), ApiError> {
    let rid = &req_id.0;
    let document = resolve_document(rid, &name)?;
    let record = build_record(rid, document, &form)?;

    let _guard = state.write_lock.lock().await;
    let mut records = state
        .content
        .read_document(document)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    records.push(record.clone());
    let index = records.len() - 1;
    commit(&state, rid, document, &records).await?;

    tracing::info!(document = %document, index, "admin record created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::new(&req_id, RecordWritten { index, record }),
    ))
}

/// PUT /api/v1/admin/documents/{document}/{index}: replace a record.
pub(super) async fn replace_record(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((name, index)): Path<(String, usize)>,
    Json(form): Json<Form>,
) -> Result<Json<ApiResponse<RecordWritten>>, ApiError> {
    let rid = &req_id.0;
    let document = resolve_document(rid, &name)?;
    let record = build_record(rid, document, &form)?;

    let _guard = state.write_lock.lock().await;
    let mut records = state
        .content
        .read_document(document)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    let Some(slot) = records.get_mut(index) else {
        return Err(record_not_found(rid, document, index));
    };
    *slot = record.clone();
    commit(&state, rid, document, &records).await?;

    tracing::info!(document = %document, index, "admin record replaced");
    Ok(ApiResponse::new(&req_id, RecordWritten { index, record }))
}

/// DELETE /api/v1/admin/documents/{document}/{index}
pub(super) async fn delete_record(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((name, index)): Path<(String, usize)>,
) -> Result<Json<ApiResponse<RecordDeleted>>, ApiError> {
    let rid = &req_id.0;
    let document = resolve_document(rid, &name)?;

    let _guard = state.write_lock.lock().await;
    let mut records = state
        .content
        .read_document(document)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    if index >= records.len() {
        return Err(record_not_found(rid, document, index));
    }
    records.remove(index);
    commit(&state, rid, document, &records).await?;

    tracing::info!(document = %document, index, "admin record deleted");
    Ok(ApiResponse::new(
        &req_id,
        RecordDeleted {
            index,
            remaining: records.len(),
        },
    ))
}
