//! Admin-editable content documents and form-to-record conversion.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::wiki::WikiKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// The fixed set of JSON documents the admin editor may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentDocument {
    Organizations,
    Personalities,
    Events,
    Materials,
    Guides,
}

impl ContentDocument {
    pub const ALL: [ContentDocument; 5] = [
        ContentDocument::Organizations,
        ContentDocument::Personalities,
        ContentDocument::Events,
        ContentDocument::Materials,
        ContentDocument::Guides,
    ];

    /// Accepts the bare name (`events`) or the file name (`events.json`).
    /// Anything else, path separators included, is rejected.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json").unwrap_or(name);
        Self::ALL.into_iter().find(|doc| doc.stem() == stem)
    }

    fn stem(self) -> &'static str {
        match self {
            ContentDocument::Organizations => "organizations",
            ContentDocument::Personalities => "personalities",
            ContentDocument::Events => "events",
            ContentDocument::Materials => "materials",
            ContentDocument::Guides => "guides",
        }
    }

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            ContentDocument::Organizations => "organizations.json",
            ContentDocument::Personalities => "personalities.json",
            ContentDocument::Events => "events.json",
            ContentDocument::Materials => "materials.json",
            ContentDocument::Guides => "guides.json",
        }
    }

    /// The wiki kind backed by this document, if any.
    #[must_use]
    pub fn wiki_kind(self) -> Option<WikiKind> {
        match self {
            ContentDocument::Organizations => Some(WikiKind::Organization),
            ContentDocument::Personalities => Some(WikiKind::Person),
            ContentDocument::Events => Some(WikiKind::Event),
            ContentDocument::Materials | ContentDocument::Guides => None,
        }
    }

    /// Build a stored record from submitted form fields.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::MissingField`] when `id` (wiki documents) or
    /// `title` (materials, guides) is blank, and
    /// [`EditorError::InvalidField`] for an unknown guide type.
    pub fn build_record(self, form: &HashMap<String, String>) -> Result<Value, EditorError> {
        let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();
        let nullable = |name: &str| match field(name) {
            "" => Value::Null,
            v => Value::String(v.to_string()),
        };

        match self {
            ContentDocument::Materials => {
                let title = required(field("title"), "title")?;
                Ok(json!({
                    "title": title,
                    "image": field("image"),
                    "tag": nullable("tag"),
                    "description": field("description").replace("\r\n", "\n"),
                }))
            }
            ContentDocument::Guides => {
                let title = required(field("title"), "title")?;
                let kind = match field("type") {
                    "" | "image" => "image",
                    "youtube" => "youtube",
                    other => {
                        return Err(EditorError::InvalidField {
                            field: "type",
                            reason: format!("expected image or youtube, got '{other}'"),
                        })
                    }
                };
                Ok(json!({
                    "title": title,
                    "source": field("source"),
                    "type": kind,
                }))
            }
            ContentDocument::Organizations | ContentDocument::Personalities | ContentDocument::Events => {
                let id = required(field("id"), "id")?;
                let name = match field("name") {
                    "" => id,
                    name => name,
                };

                let mut record = Map::new();
                record.insert("id".into(), json!(id));
                record.insert("name".into(), json!(name));
                record.insert(
                    "description".into(),
                    json!(field("description").replace("\r\n", "\n")),
                );

                match self {
                    ContentDocument::Organizations => {
                        let leaders: Vec<&str> = field("leader")
                            .lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .collect();
                        record.insert("created".into(), json!(field("created")));
                        record.insert("closed".into(), nullable("closed"));
                        record.insert("reason_for_closing".into(), nullable("reason_for_closing"));
                        record.insert("peak_members".into(), json!(field("peak_members")));
                        record.insert("leader".into(), json!(leaders));
                    }
                    ContentDocument::Personalities => {
                        record.insert("created".into(), json!(field("created")));
                        record.insert("departed".into(), nullable("departed"));
                        record.insert("old_nicknames".into(), json!(field("old_nicknames")));
                    }
                    _ => {
                        record.insert("event_type".into(), json!(field("event_type")));
                        record.insert("date".into(), json!(field("date")));
                    }
                }
                Ok(Value::Object(record))
            }
        }
    }
}

impl From<WikiKind> for ContentDocument {
    fn from(kind: WikiKind) -> Self {
        match kind {
            WikiKind::Organization => ContentDocument::Organizations,
            WikiKind::Person => ContentDocument::Personalities,
            WikiKind::Event => ContentDocument::Events,
        }
    }
}

impl std::fmt::Display for ContentDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

fn required<'a>(value: &'a str, name: &'static str) -> Result<&'a str, EditorError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(EditorError::MissingField(name))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn from_name_accepts_known_documents_only() {
        assert_eq!(ContentDocument::from_name("events.json"), Some(ContentDocument::Events));
        assert_eq!(ContentDocument::from_name("guides"), Some(ContentDocument::Guides));
        assert_eq!(ContentDocument::from_name("../secrets.json"), None);
        assert_eq!(ContentDocument::from_name("users.json"), None);
        assert_eq!(ContentDocument::from_name(""), None);
    }

    #[test]
    fn organization_record() {
        let record = ContentDocument::Organizations
            .build_record(&form(&[
                ("id", "org-1"),
                ("description", "line one\r\nline two"),
                ("created", "2019"),
                ("closed", ""),
                ("peak_members", "120"),
                ("leader", " Alice \n\n Bob\n"),
            ]))
            .expect("record");

        assert_eq!(record["name"], "org-1");
        assert_eq!(record["description"], "line one\nline two");
        assert_eq!(record["closed"], Value::Null);
        assert_eq!(record["reason_for_closing"], Value::Null);
        assert_eq!(record["peak_members"], "120");
        assert_eq!(record["leader"], json!(["Alice", "Bob"]));
    }

    #[test]
    fn person_record_keeps_departed() {
        let record = ContentDocument::Personalities
            .build_record(&form(&[("id", "p1"), ("name", "Zed"), ("departed", "2023")]))
            .expect("record");
        assert_eq!(record["name"], "Zed");
        assert_eq!(record["departed"], "2023");
        assert_eq!(record["old_nicknames"], "");
    }

    #[test]
    fn event_record() {
        let record = ContentDocument::Events
            .build_record(&form(&[("id", "e1"), ("event_type", "raid"), ("date", "2022-05-01")]))
            .expect("record");
        assert_eq!(record["event_type"], "raid");
        assert_eq!(record["date"], "2022-05-01");
        assert!(record.get("leader").is_none());
    }

    #[test]
    fn wiki_record_requires_id() {
        let err = ContentDocument::Events
            .build_record(&form(&[("name", "x")]))
            .unwrap_err();
        assert_eq!(err, EditorError::MissingField("id"));
    }

    #[test]
    fn material_and_guide_require_title() {
        assert_eq!(
            ContentDocument::Materials.build_record(&form(&[("image", "a.png")])).unwrap_err(),
            EditorError::MissingField("title")
        );
        assert_eq!(
            ContentDocument::Guides.build_record(&form(&[("title", "  ")])).unwrap_err(),
            EditorError::MissingField("title")
        );
    }

    #[test]
    fn guide_type_defaults_to_image_and_rejects_unknown() {
        let record = ContentDocument::Guides
            .build_record(&form(&[("title", "Map"), ("source", "map.png")]))
            .expect("record");
        assert_eq!(record["type"], "image");

        let err = ContentDocument::Guides
            .build_record(&form(&[("title", "Map"), ("type", "vimeo")]))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidField { field: "type", .. }));
    }

    #[test]
    fn material_blank_tag_is_null() {
        let record = ContentDocument::Materials
            .build_record(&form(&[("title", "Logo"), ("image", "logo.png")]))
            .expect("record");
        assert_eq!(record["tag"], Value::Null);
    }
}
