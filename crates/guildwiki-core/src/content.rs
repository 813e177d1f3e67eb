//! Guides and materials: raw document records and the cards built from them.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_MATERIAL_TAG: &str = "Uncategorized";
pub const ALL_TAGS: &str = "All";

static YOUTUBE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid youtube id regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideKind {
    Youtube,
    #[default]
    #[serde(other)]
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guide {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "type", default)]
    pub kind: GuideKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Material {
    #[must_use]
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_MATERIAL_TAG)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuideCard {
    pub title: String,
    pub preview_url: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialCard {
    pub title: String,
    pub preview_url: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Extract the 11-character video ID from a YouTube URL.
#[must_use]
pub fn youtube_video_id(source: &str) -> Option<&str> {
    YOUTUBE_ID
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Build display cards; guides without a usable preview are dropped.
#[must_use]
pub fn guide_cards(guides: &[Guide]) -> Vec<GuideCard> {
    guides
        .iter()
        .filter_map(|guide| {
            let (preview_url, link) = match guide.kind {
                GuideKind::Youtube => {
                    let id = youtube_video_id(&guide.source)?;
                    (
                        format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"),
                        guide.source.clone(),
                    )
                }
                GuideKind::Image => {
                    if guide.source.is_empty() {
                        return None;
                    }
                    let url = format!("/static/img/guides/{}", guide.source);
                    (url.clone(), url)
                }
            };
            Some(GuideCard {
                title: guide.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                preview_url,
                link,
            })
        })
        .collect()
}

/// Build display cards; materials without an image are dropped.
#[must_use]
pub fn material_cards(materials: &[Material]) -> Vec<MaterialCard> {
    materials
        .iter()
        .filter(|m| !m.image.is_empty())
        .map(|m| MaterialCard {
            title: m.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            preview_url: format!("/static/img/materials/{}", m.image),
            tag: m.tag().to_string(),
            description: m.description.clone(),
        })
        .collect()
}

/// Filter tags: `All` first, then every other distinct tag sorted.
///
/// Tags of materials without an image still appear.
#[must_use]
pub fn material_tags(materials: &[Material]) -> Vec<String> {
    let distinct: BTreeSet<&str> = materials
        .iter()
        .map(Material::tag)
        .filter(|tag| *tag != ALL_TAGS)
        .collect();
    std::iter::once(ALL_TAGS)
        .chain(distinct)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn guides() -> Vec<Guide> {
        serde_json::from_value(json!([
            {"title": "Watch", "source": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "type": "youtube"},
            {"title": "Short", "source": "https://youtu.be/dQw4w9WgXcQ", "type": "youtube"},
            {"title": "Broken", "source": "https://youtube.com/", "type": "youtube"},
            {"source": "map.png"},
            {"title": "Empty", "source": ""}
        ]))
        .expect("guides")
    }

    #[test]
    fn youtube_id_after_v_or_slash() {
        assert_eq!(youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_video_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_video_id("https://youtube.com/"), None);
    }

    #[test]
    fn guide_cards_build_previews_and_drop_unusable() {
        let cards = guide_cards(&guides());
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].preview_url, "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg");
        assert_eq!(cards[0].link, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(cards[2].title, "Untitled");
        assert_eq!(cards[2].preview_url, "/static/img/guides/map.png");
        assert_eq!(cards[2].link, cards[2].preview_url);
    }

    #[test]
    fn unknown_guide_type_is_image() {
        let guide: Guide = serde_json::from_value(json!({"source": "a.png", "type": "gif"})).expect("guide");
        assert_eq!(guide.kind, GuideKind::Image);
    }

    #[test]
    fn material_tags_put_all_first() {
        let materials: Vec<Material> = serde_json::from_value(json!([
            {"title": "a", "image": "a.png", "tag": "Maps"},
            {"title": "b", "image": "b.png", "tag": "Art"},
            {"title": "c", "image": "c.png"},
            {"title": "d", "image": "", "tag": "Hidden"},
            {"title": "e", "image": "e.png", "tag": "All"}
        ]))
        .expect("materials");

        assert_eq!(
            material_tags(&materials),
            vec!["All", "Art", "Hidden", "Maps", "Uncategorized"]
        );
        let cards = material_cards(&materials);
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[2].tag, "Uncategorized");
        assert_eq!(cards[0].preview_url, "/static/img/materials/a.png");
    }
}
