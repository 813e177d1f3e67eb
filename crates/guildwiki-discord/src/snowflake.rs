use chrono::{DateTime, Utc};

/// Milliseconds since the Unix epoch of 2015-01-01T00:00:00Z.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation time encoded in a Discord snowflake ID.
///
/// Returns `None` for anything that is not a decimal `u64`.
#[must_use]
pub fn snowflake_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let raw: u64 = id.parse().ok()?;
    let offset_ms = i64::try_from(raw >> 22).ok()?;
    DateTime::from_timestamp_millis(offset_ms.checked_add(DISCORD_EPOCH_MS)?)
}
