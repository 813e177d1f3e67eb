//! Lenient timestamp parsing for guild documents.
//!
//! Documents are written with RFC 3339 strings, but older collectors stored
//! float epoch seconds (`history[].timestamp`, `members[].joined_at`) and a
//! `dd.mm.yyyy` date (`info.created_at`). All three forms are read.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value;

const DOTTED_DATE: &str = "%d.%m.%Y";

/// Epoch seconds with a fractional part.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn from_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, DOTTED_DATE)
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn from_value<E: de::Error>(value: Value) -> Result<Option<DateTime<Utc>>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch_secs)
            .map(Some)
            .ok_or_else(|| E::custom(format!("epoch seconds out of range: {n}"))),
        Value::String(s) => from_str(&s)
            .map(Some)
            .ok_or_else(|| E::custom(format!("unrecognised timestamp '{s}'"))),
        other => Err(E::custom(format!(
            "expected timestamp string or number, got {other}"
        ))),
    }
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    from_value(Value::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("timestamp must not be null"))
}

pub(crate) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    from_value(Value::deserialize(deserializer)?)
}
