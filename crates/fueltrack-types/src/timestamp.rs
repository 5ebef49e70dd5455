//! Timestamp (de)serialization for persisted readings.
//!
//! Readings are written as RFC 3339. Documents produced by the earlier
//! tracker stored naive ISO 8601 date-times without an offset; those are
//! accepted on load and interpreted as UTC.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{ParseError, ParseResult};

const NAIVE_ISO: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// Parse a timestamp string, accepting RFC 3339 or naive ISO 8601.
///
/// # Examples
///
/// ```
/// use fueltrack_types::timestamp;
///
/// let ts = timestamp::parse("2025-01-01T09:30:00+01:00").unwrap();
/// assert_eq!(ts.hour(), 9);
///
/// let legacy = timestamp::parse("2025-01-01T09:30:00.123456").unwrap();
/// assert_eq!(legacy.offset(), time::UtcOffset::UTC);
/// ```
pub fn parse(raw: &str) -> ParseResult<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }

    PrimitiveDateTime::parse(raw, NAIVE_ISO)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| ParseError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Serialize as RFC 3339.
pub fn serialize<S>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    time::serde::rfc3339::serialize(ts, serializer)
}

/// Deserialize from RFC 3339 or naive ISO 8601.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// The current time in the local offset, falling back to UTC when the
/// platform cannot report it.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
