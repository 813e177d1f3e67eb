use std::path::{Path, PathBuf};

use axum::body::{to_bytes, Body};
use axum::http::Request;
use guildwiki_core::{GuildInfo, GuildSnapshot};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;

struct Fixture {
    _root: TempDir,
    app: Router,
    content_dir: PathBuf,
}

fn write_file(path: &Path, bytes: &[u8]) {
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    std::fs::write(path, bytes).expect("write file");
}

fn write_json(path: &Path, value: &Value) {
    write_file(path, &serde_json::to_vec_pretty(value).expect("serialize"));
}

fn guild(id: &str, name: &str) -> (String, GuildSnapshot) {
    let snapshot = GuildSnapshot {
        info: GuildInfo {
            id: id.to_owned(),
            name: name.to_owned(),
            member_count: 10,
            online_count: 4,
            icon_url: Some(format!("assets/{id}_icon.png")),
            ..GuildInfo::default()
        },
        ..GuildSnapshot::default()
    };
    (id.to_owned(), snapshot)
}

async fn fixture(admin_password: Option<&str>) -> Fixture {
    let root = TempDir::new().expect("tempdir");
    let content_dir = root.path().join("pages_data");
    let static_dir = root.path().join("static");
    let assets_dir = root.path().join("servers").join("assets");

    write_json(
        &content_dir.join("organizations.json"),
        &json!([
            {"id": "1", "name": "Night Owls", "peak_members": "1200", "created": "2019"},
            {"id": 2, "name": "Тёмный Орден"}
        ]),
    );
    write_json(
        &content_dir.join("personalities.json"),
        &json!([{"id": "p1", "name": "Zed"}]),
    );
    write_json(
        &content_dir.join("events.json"),
        &json!([{"id": "e1", "name": "Winter Fest", "date": "2021-12-01"}]),
    );
    write_json(
        &content_dir.join("guides.json"),
        &json!([
            {"title": "Map", "source": "map.png", "type": "image"},
            {"title": "Intro", "source": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "type": "youtube"},
            {"title": "Broken", "source": "https://example.org/video", "type": "youtube"}
        ]),
    );
    write_json(
        &content_dir.join("materials.json"),
        &json!([
            {"title": "Logo", "image": "logo.png", "tag": "Branding"},
            {"title": "Poster", "image": "poster.png", "tag": "Art"},
            {"title": "Draft", "image": "", "tag": "Drafts"}
        ]),
    );

    let gallery = static_dir.join("img/wiki/organization/1");
    write_file(&gallery.join("b.png"), b"png");
    write_file(&gallery.join("A.jpg"), b"jpg");
    write_file(&gallery.join("notes.txt"), b"text");
    write_file(&assets_dir.join("100_icon.png"), b"icon");

    let directory = ServerDirectory::from_loaded(vec![
        guild("100", "alpha"),
        guild("200", "Zeta"),
        guild("300", "Alpha"),
    ]);
    let content = ContentStore::new(&content_dir);
    let wiki = content.load_wiki().await;

    let state = AppState {
        directory: Arc::new(directory),
        wiki: Arc::new(RwLock::new(wiki)),
        content,
        write_lock: Arc::new(Mutex::new(())),
        sessions: SessionStore::new("test-secret", Duration::from_secs(3600), 8),
        admin_password: admin_password.map(Arc::from),
        public_url: None,
        static_dir,
        assets_dir,
        admin_static_dir: root.path().join("admin_static"),
    };

    Fixture {
        app: build_app(state, default_login_rate_limit()),
        content_dir,
        _root: root,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn authed(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &Router, password: &str) -> String {
    let (status, json) = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/admin/login",
            None,
            &json!({"password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["data"]["token"]
        .as_str()
        .expect("token")
        .to_owned()
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("validation_error", StatusCode::BAD_REQUEST),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "{code}");
    }
}

#[tokio::test]
async fn health_reports_loaded_servers_and_echoes_request_id() {
    let fx = fixture(None).await;
    let request = Request::builder()
        .uri("/api/v1/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .expect("request");

    let response = fx.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["data"], json!({"status": "ok", "servers": 3}));
    assert_eq!(json["meta"]["request_id"], "req-42");
}

#[tokio::test]
async fn servers_are_listed_by_lowercased_name() {
    let fx = fixture(None).await;
    let (status, json) = send(&fx.app, get("/api/v1/servers")).await;

    assert_eq!(status, StatusCode::OK);
    let servers = json["data"].as_array().expect("data array");
    let ids: Vec<&str> = servers
        .iter()
        .map(|s| s["guild_id"].as_str().expect("guild_id"))
        .collect();
    assert_eq!(ids, ["100", "300", "200"]);
    assert_eq!(servers[0]["slug"], "alpha");
    // Second "alpha" lost the slug and routes by ID.
    assert_eq!(servers[1]["slug"], "300");
    assert_eq!(servers[0]["icon_url"], "/servers/assets/100_icon.png");
}

#[tokio::test]
async fn server_detail_resolves_slug_then_numeric_id() {
    let fx = fixture(None).await;

    let (status, json) = send(&fx.app, get("/api/v1/servers/zeta")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["guild_id"], "200");
    assert_eq!(json["data"]["snapshot"]["info"]["member_count"], 10);

    let (status, json) = send(&fx.app, get("/api/v1/servers/300")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Alpha");

    let (status, json) = send(&fx.app, get("/api/v1/servers/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let (status, _) = send(&fx.app, get("/api/v1/servers/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cached_assets_are_served() {
    let fx = fixture(None).await;
    let response = fx
        .app
        .clone()
        .oneshot(get("/servers/assets/100_icon.png"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    assert_eq!(&body[..], b"icon");
}

#[tokio::test]
async fn wiki_listing_includes_bounds() {
    let fx = fixture(None).await;
    let (status, json) = send(&fx.app, get("/api/v1/wiki")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["organizations"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["data"]["organizations"][1]["id"], "2");
    assert_eq!(
        json["data"]["bounds"],
        json!({"min_year": 2017, "max_year": 2025, "max_members": 1200})
    );
}

#[tokio::test]
async fn wiki_detail_lists_gallery_for_organizations() {
    let fx = fixture(None).await;
    let (status, json) = send(&fx.app, get("/api/v1/wiki/night-owls")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["kind"], "organization");
    let originals: Vec<&str> = json["data"]["gallery"]
        .as_array()
        .expect("gallery")
        .iter()
        .map(|img| img["original"].as_str().expect("original"))
        .collect();
    assert_eq!(originals, ["A.jpg", "b.png"]);
    assert_eq!(
        json["data"]["gallery"][0]["url"],
        "/static/img/wiki/organization/1/A.jpg"
    );
}

#[tokio::test]
async fn wiki_detail_by_id_and_missing() {
    let fx = fixture(None).await;

    let (status, json) = send(&fx.app, get("/api/v1/wiki/e1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["kind"], "event");
    assert_eq!(json["data"]["gallery"], json!([]));

    let (status, _) = send(&fx.app, get("/api/v1/wiki/nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guides_drop_unusable_sources() {
    let fx = fixture(None).await;
    let (status, json) = send(&fx.app, get("/api/v1/guides")).await;

    assert_eq!(status, StatusCode::OK);
    let guides = json["data"].as_array().expect("guides");
    assert_eq!(guides.len(), 2);
    assert_eq!(guides[0]["preview_url"], "/static/img/guides/map.png");
    assert_eq!(
        guides[1]["preview_url"],
        "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
    );
}

#[tokio::test]
async fn materials_include_sorted_tags() {
    let fx = fixture(None).await;
    let (status, json) = send(&fx.app, get("/api/v1/materials")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["materials"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["data"]["tags"], json!(["All", "Art", "Branding", "Drafts"]));
}

#[tokio::test]
async fn sitemap_is_xml_and_needs_a_host() {
    let fx = fixture(None).await;
    let request = Request::builder()
        .uri("/sitemap.xml")
        .header(header::HOST, "wiki.local")
        .body(Body::empty())
        .expect("request");

    let response = fx.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/xml")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let xml = String::from_utf8(body.to_vec()).expect("utf8");
    assert!(xml.contains("<loc>http://wiki.local/server/alpha</loc>"));
    assert!(xml.contains("<loc>http://wiki.local/wiki/night-owls</loc>"));

    let (status, json) = send(&fx.app, get("/sitemap.xml")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn login_is_disabled_without_password() {
    let fx = fixture(None).await;
    let (status, json) = send(
        &fx.app,
        json_request(
            Method::POST,
            "/api/v1/admin/login",
            None,
            &json!({"password": "anything"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "admin login is disabled");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let fx = fixture(Some("hunter2")).await;
    let (status, json) = send(
        &fx.app,
        json_request(
            Method::POST,
            "/api/v1/admin/login",
            None,
            &json!({"password": "hunter3"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn admin_routes_require_session() {
    let fx = fixture(Some("hunter2")).await;

    let (status, json) = send(&fx.app, get("/api/v1/admin/documents/events")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let (status, _) = send(
        &fx.app,
        authed(Method::GET, "/api/v1/admin/documents/events", "forged"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_create_writes_document_and_refreshes_wiki() {
    let fx = fixture(Some("hunter2")).await;
    let token = login(&fx.app, "hunter2").await;

    let (status, json) = send(
        &fx.app,
        json_request(
            Method::POST,
            "/api/v1/admin/documents/events.json",
            Some(&token),
            &json!({"id": "e2", "name": "Spring Raid", "event_type": "raid", "date": "2023-03-01"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["index"], 1);
    assert_eq!(json["data"]["record"]["event_type"], "raid");

    let on_disk: Value = serde_json::from_slice(
        &std::fs::read(fx.content_dir.join("events.json")).expect("read events"),
    )
    .expect("parse events");
    assert_eq!(on_disk[1]["id"], "e2");

    let (status, json) = send(&fx.app, get("/api/v1/wiki/spring-raid")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["entity"]["date"], "2023-03-01");
}

#[tokio::test]
async fn admin_replace_and_delete_records() {
    let fx = fixture(Some("hunter2")).await;
    let token = login(&fx.app, "hunter2").await;

    let (status, json) = send(
        &fx.app,
        json_request(
            Method::PUT,
            "/api/v1/admin/documents/materials/0",
            Some(&token),
            &json!({"title": "New Logo", "image": "logo2.png"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["record"]["tag"], Value::Null);

    let (_, json) = send(
        &fx.app,
        authed(Method::GET, "/api/v1/admin/documents/materials", &token),
    )
    .await;
    assert_eq!(json["data"]["document"], "materials.json");
    assert_eq!(json["data"]["records"][0]["title"], "New Logo");

    let (status, json) = send(
        &fx.app,
        authed(Method::DELETE, "/api/v1/admin/documents/materials/2", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["remaining"], 2);

    let (status, _) = send(
        &fx.app,
        authed(Method::DELETE, "/api/v1/admin/documents/materials/2", &token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_rejects_invalid_forms_and_unknown_documents() {
    let fx = fixture(Some("hunter2")).await;
    let token = login(&fx.app, "hunter2").await;

    let (status, json) = send(
        &fx.app,
        json_request(
            Method::PUT,
            "/api/v1/admin/documents/organizations/0",
            Some(&token),
            &json!({"name": "No Id"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, _) = send(
        &fx.app,
        json_request(
            Method::PUT,
            "/api/v1/admin/documents/organizations/9",
            Some(&token),
            &json!({"id": "9"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(
        &fx.app,
        authed(Method::GET, "/api/v1/admin/documents/users", &token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let untouched: Value = serde_json::from_slice(
        &std::fs::read(fx.content_dir.join("organizations.json")).expect("read organizations"),
    )
    .expect("parse organizations");
    assert_eq!(untouched[0]["name"], "Night Owls");
}

#[tokio::test]
async fn logout_revokes_session() {
    let fx = fixture(Some("hunter2")).await;
    let token = login(&fx.app, "hunter2").await;

    let (status, json) = send(
        &fx.app,
        authed(Method::POST, "/api/v1/admin/logout", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["revoked"], true);

    let (status, _) = send(
        &fx.app,
        authed(Method::GET, "/api/v1/admin/documents/guides", &token),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
