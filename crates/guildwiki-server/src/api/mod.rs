mod admin;
mod content;
mod servers;
mod sitemap;
mod wiki;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use guildwiki_core::{ServerDirectory, WikiCatalog};
use guildwiki_store::ContentStore;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_admin_session, RateLimitState, RequestId,
};
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    /// Guild documents as loaded at startup; never reloaded.
    pub directory: Arc<ServerDirectory>,
    /// Refreshed after every admin write to a wiki document.
    pub wiki: Arc<RwLock<WikiCatalog>>,
    pub content: ContentStore,
    /// Serializes read-modify-write cycles on content documents.
    pub write_lock: Arc<Mutex<()>>,
    pub sessions: SessionStore,
    /// `None` disables admin login.
    pub admin_password: Option<Arc<str>>,
    pub public_url: Option<Arc<str>>,
    pub static_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub admin_static_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    servers: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: &RequestId, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id.0.clone()),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_store_error(request_id: &str, error: &guildwiki_store::StoreError) -> ApiError {
    tracing::error!(error = %error, "content store operation failed");
    ApiError::new(request_id, "internal_error", "content store operation failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(sessions: SessionStore) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/logout", post(admin::logout))
        .route(
            "/api/v1/admin/documents/{document}",
            get(admin::list_records).post(admin::create_record),
        )
        .route(
            "/api/v1/admin/documents/{document}/{index}",
            put(admin::replace_record).delete(admin::delete_record),
        )
        .layer(axum::middleware::from_fn_with_state(
            sessions,
            require_admin_session,
        ))
}

fn login_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/login", post(admin::login))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, login_rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/servers", get(servers::list_servers))
        .route("/api/v1/servers/{slug}", get(servers::get_server))
        .route("/api/v1/wiki", get(wiki::list_wiki))
        .route("/api/v1/wiki/{slug}", get(wiki::get_wiki_entity))
        .route("/api/v1/guides", get(content::list_guides))
        .route("/api/v1/materials", get(content::list_materials))
        .route("/sitemap.xml", get(sitemap::sitemap));

    let files = Router::new()
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .nest_service("/admin_static", ServeDir::new(&state.admin_static_dir))
        .nest_service("/servers/assets", ServeDir::new(&state.assets_dir));

    Router::new()
        .merge(public_routes)
        .merge(login_router(login_rate_limit))
        .merge(admin_router(state.sessions.clone()))
        .merge(files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    ApiResponse::new(
        &req_id,
        HealthData {
            status: "ok",
            servers: state.directory.len(),
        },
    )
}

/// Login attempts allowed per minute from one client address.
pub fn default_login_rate_limit() -> RateLimitState {
    RateLimitState::new(10, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
