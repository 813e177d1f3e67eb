//! `sitemap.xml` generation.

use std::collections::BTreeSet;
use std::io::Cursor;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use guildwiki_core::{ServerDirectory, WikiCatalog};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const STATIC_PAGES: [&str; 7] = [
    "",
    "/index",
    "/wiki",
    "/servers",
    "/guides",
    "/materials",
    "/info",
];

/// Bytes escaped in path components; everything non-ASCII is always escaped.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Every site path worth indexing, sorted and deduplicated.
fn collect_paths(directory: &ServerDirectory, catalog: &WikiCatalog) -> BTreeSet<String> {
    let mut paths: BTreeSet<String> = STATIC_PAGES.iter().map(|p| (*p).to_owned()).collect();
    paths.extend(
        directory
            .slug_index()
            .slugs()
            .map(|slug| format!("/server/{slug}")),
    );
    paths.extend(
        directory
            .guild_ids()
            .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
            .map(|id| format!("/server/{id}")),
    );
    paths.extend(
        catalog
            .route_segments()
            .into_iter()
            .map(|segment| format!("/wiki/{segment}")),
    );
    paths
}

fn priority(path: &str) -> (&'static str, &'static str) {
    if path == "/info" {
        ("1.0", "yearly")
    } else if path.starts_with("/wiki/") {
        ("0.9", "weekly")
    } else {
        ("0.6", "daily")
    }
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

fn render_sitemap(
    base_url: &str,
    paths: &BTreeSet<String>,
    today: NaiveDate,
) -> Result<String, String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    let lastmod = today.format("%Y-%m-%d").to_string();

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)])),
    )?;

    for path in paths {
        let loc = format!("{base_url}{}", utf8_percent_encode(path, PATH));
        let (priority, changefreq) = priority(path);

        emit(&mut writer, Event::Start(BytesStart::new("url")))?;
        for (tag, value) in [
            ("loc", loc.as_str()),
            ("lastmod", lastmod.as_str()),
            ("changefreq", changefreq),
            ("priority", priority),
        ] {
            emit(&mut writer, Event::Start(BytesStart::new(tag)))?;
            emit(&mut writer, Event::Text(BytesText::new(value)))?;
            emit(&mut writer, Event::End(BytesEnd::new(tag)))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("url")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("urlset")))?;
    String::from_utf8(writer.into_inner().into_inner()).map_err(|e| e.to_string())
}

/// Configured public URL, else scheme and `Host` of the request.
fn base_url(configured: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(url) = configured {
        return Some(url.trim_end_matches('/').to_owned());
    }
    let host = headers.get(header::HOST)?.to_str().ok()?.trim();
    if host.is_empty() {
        return None;
    }
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|s| matches!(*s, "http" | "https"))
        .unwrap_or("http");
    Some(format!("{scheme}://{host}"))
}

/// GET /sitemap.xml
pub(super) async fn sitemap(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(base) = base_url(state.public_url.as_deref(), &headers) else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "cannot build sitemap without a Host header",
        ));
    };

    let paths = {
        let catalog = state.wiki.read().await;
        collect_paths(&state.directory, &catalog)
    };

    match render_sitemap(&base, &paths, Utc::now().date_naive()) {
        Ok(xml) => Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response()),
        Err(e) => {
            tracing::error!(error = %e, "failed to render sitemap");
            Err(ApiError::new(
                req_id.0,
                "internal_error",
                "failed to render sitemap",
            ))
        }
    }
}
