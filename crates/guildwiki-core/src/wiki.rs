//! Wiki entities and the live slug-or-ID lookup over them.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::slug::wiki_slug;

pub const MIN_YEAR: i32 = 2017;
pub const MAX_YEAR: i32 = 2025;
/// Lower bound for the member-count filter, whatever the data says.
pub const MIN_MAX_MEMBERS: u64 = 935;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WikiKind {
    Organization,
    Person,
    Event,
}

impl WikiKind {
    /// Lookup order: organizations, then persons, then events.
    pub const ALL: [WikiKind; 3] = [WikiKind::Organization, WikiKind::Person, WikiKind::Event];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WikiKind::Organization => "organization",
            WikiKind::Person => "person",
            WikiKind::Event => "event",
        }
    }

    /// Content document holding this kind of record.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            WikiKind::Organization => "organizations.json",
            WikiKind::Person => "personalities.json",
            WikiKind::Event => "events.json",
        }
    }

    /// Folder under `static/img/wiki/` holding gallery images.
    #[must_use]
    pub fn gallery_folder(self) -> &'static str {
        match self {
            WikiKind::Organization => "organization",
            WikiKind::Person => "personalities",
            WikiKind::Event => "events",
        }
    }

    /// Events never show a gallery.
    #[must_use]
    pub fn has_gallery(self) -> bool {
        !matches!(self, WikiKind::Event)
    }
}

impl std::fmt::Display for WikiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A free-form wiki record.
///
/// `id` may be a string or a number in the source file and is normalised to
/// a string. Keys other than `id`, `name` and `description` are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiEntity {
    #[serde(default, deserialize_with = "id_from_value")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn id_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

impl WikiEntity {
    #[must_use]
    pub fn slug(&self) -> String {
        self.name.as_deref().map(wiki_slug).unwrap_or_default()
    }

    /// Path segment used in links: the name slug, or the ID when the name
    /// slugifies to nothing.
    #[must_use]
    pub fn route_segment(&self) -> String {
        let slug = self.slug();
        if slug.is_empty() {
            self.id.clone()
        } else {
            slug
        }
    }

    /// `peak_members` as a number; accepts numeric strings.
    #[must_use]
    pub fn peak_members(&self) -> Option<u64> {
        match self.extra.get("peak_members")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn matches(&self, query: &str) -> bool {
        if !self.id.is_empty() && self.id == query {
            return true;
        }
        let slug = self.slug();
        !slug.is_empty() && slug == query
    }
}

/// Slider bounds for the wiki filter UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WikiBounds {
    pub min_year: i32,
    pub max_year: i32,
    pub max_members: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WikiCatalog {
    pub organizations: Vec<WikiEntity>,
    pub persons: Vec<WikiEntity>,
    pub events: Vec<WikiEntity>,
}

impl WikiCatalog {
    #[must_use]
    pub fn entities(&self, kind: WikiKind) -> &[WikiEntity] {
        match kind {
            WikiKind::Organization => &self.organizations,
            WikiKind::Person => &self.persons,
            WikiKind::Event => &self.events,
        }
    }

    pub fn set_entities(&mut self, kind: WikiKind, entities: Vec<WikiEntity>) {
        match kind {
            WikiKind::Organization => self.organizations = entities,
            WikiKind::Person => self.persons = entities,
            WikiKind::Event => self.events = entities,
        }
    }

    /// Find an entity by raw ID or name slug.
    ///
    /// Scans organizations, persons, then events; within each record the ID
    /// is checked before the slug. First match wins.
    #[must_use]
    pub fn find_by_slug_or_id(&self, query: &str) -> Option<(WikiKind, &WikiEntity)> {
        WikiKind::ALL.into_iter().find_map(|kind| {
            self.entities(kind)
                .iter()
                .find(|e| e.matches(query))
                .map(|e| (kind, e))
        })
    }

    #[must_use]
    pub fn bounds(&self) -> WikiBounds {
        let peak = self
            .organizations
            .iter()
            .filter_map(WikiEntity::peak_members)
            .max()
            .unwrap_or(0);
        WikiBounds {
            min_year: MIN_YEAR,
            max_year: MAX_YEAR,
            max_members: peak.max(MIN_MAX_MEMBERS),
        }
    }

    /// Link segments for every entity that has an ID.
    #[must_use]
    pub fn route_segments(&self) -> Vec<String> {
        WikiKind::ALL
            .into_iter()
            .flat_map(|kind| self.entities(kind))
            .filter(|e| !e.id.is_empty())
            .map(WikiEntity::route_segment)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entity(value: Value) -> WikiEntity {
        serde_json::from_value(value).expect("entity")
    }

    fn catalog() -> WikiCatalog {
        WikiCatalog {
            organizations: vec![
                entity(json!({"id": 1, "name": "Клуб Друзей", "peak_members": "1200"})),
                entity(json!({"id": "2", "name": "Night Owls", "peak_members": 40})),
            ],
            persons: vec![entity(json!({"id": "p1", "name": "Night Owls"}))],
            events: vec![entity(json!({"id": "e1", "name": "Winter Fest", "date": "2021-12-01"}))],
        }
    }

    #[test]
    fn numeric_id_is_normalised_to_string() {
        let e = entity(json!({"id": 42, "name": "x"}));
        assert_eq!(e.id, "42");
    }

    #[test]
    fn object_id_is_rejected() {
        let result: Result<WikiEntity, _> = serde_json::from_value(json!({"id": {"a": 1}}));
        assert!(result.is_err());
    }

    #[test]
    fn extra_keys_are_preserved() {
        let e = entity(json!({"id": "1", "name": "x", "leader": ["a", "b"], "closed": null}));
        assert_eq!(e.extra["leader"], json!(["a", "b"]));
        let back = serde_json::to_value(&e).expect("serialize");
        assert_eq!(back["closed"], Value::Null);
        assert_eq!(back["leader"], json!(["a", "b"]));
    }

    #[test]
    fn finds_by_cyrillic_slug() {
        let catalog = catalog();
        let (kind, e) = catalog.find_by_slug_or_id("клуб-друзей").expect("found");
        assert_eq!(kind, WikiKind::Organization);
        assert_eq!(e.id, "1");
    }

    #[test]
    fn organizations_win_over_persons_with_same_slug() {
        let catalog = catalog();
        let (kind, e) = catalog.find_by_slug_or_id("night-owls").expect("found");
        assert_eq!(kind, WikiKind::Organization);
        assert_eq!(e.id, "2");
    }

    #[test]
    fn finds_by_raw_id() {
        let catalog = catalog();
        let (kind, e) = catalog.find_by_slug_or_id("e1").expect("found");
        assert_eq!(kind, WikiKind::Event);
        assert_eq!(e.name.as_deref(), Some("Winter Fest"));
    }

    #[test]
    fn unknown_query_is_none() {
        assert!(catalog().find_by_slug_or_id("nobody").is_none());
        assert!(catalog().find_by_slug_or_id("").is_none());
    }

    #[test]
    fn bounds_use_peak_members_with_floor() {
        assert_eq!(catalog().bounds().max_members, 1200);
        assert_eq!(WikiCatalog::default().bounds().max_members, 935);
        let bounds = WikiCatalog::default().bounds();
        assert_eq!((bounds.min_year, bounds.max_year), (2017, 2025));
    }

    #[test]
    fn route_segment_falls_back_to_id() {
        let e = entity(json!({"id": "9", "name": "!!!"}));
        assert_eq!(e.route_segment(), "9");
        let no_id = WikiCatalog {
            events: vec![entity(json!({"name": "orphan"}))],
            ..WikiCatalog::default()
        };
        assert!(no_id.route_segments().is_empty());
    }
}
