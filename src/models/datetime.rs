//! Timestamp parsing for service payloads.
//!
//! The service emits ISO-8601 timestamps with a `Z` suffix or a numeric offset
//! and anywhere from zero to nine fractional digits. Everything is normalized
//! to microsecond precision before parsing.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::{QueryError, Result};

/// Number of fractional digits kept (microseconds).
const FRACTION_DIGITS: usize = 6;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<base>\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2})(?:\.(?P<frac>\d+))?(?P<offset>[+-]\d{2}:?\d{2})?$",
    )
    .expect("timestamp pattern is valid")
});

/// Parses a service timestamp into an instant with its UTC offset.
///
/// Absent and empty input yield `Ok(None)`. A trailing `Z` means `+00:00`;
/// a timestamp with no offset at all is read as UTC. Fractional seconds are
/// right-padded or truncated (never rounded) to six digits.
pub fn parse_datetime(value: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let substituted = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };

    let caps = TIMESTAMP
        .captures(&substituted)
        .ok_or_else(|| QueryError::service(format!("Unrecognized timestamp format: '{raw}'")))?;

    let base = &caps["base"];
    let fraction = normalize_fraction(caps.name("frac").map_or("", |m| m.as_str()));
    let offset = match caps.name("offset").map(|m| m.as_str()) {
        None => "+00:00".to_string(),
        Some(o) if o.contains(':') => o.to_string(),
        Some(o) => format!("{}:{}", &o[..3], &o[3..]),
    };

    let normalized = format!("{}.{fraction}{offset}", base.replacen(' ', "T", 1));
    DateTime::parse_from_rfc3339(&normalized)
        .map(Some)
        .map_err(|e| QueryError::service(format!("Invalid timestamp '{raw}': {e}")))
}

/// Pads with zeros or truncates to exactly six digits.
fn normalize_fraction(digits: &str) -> String {
    let mut fraction: String = digits.chars().take(FRACTION_DIGITS).collect();
    while fraction.len() < FRACTION_DIGITS {
        fraction.push('0');
    }
    fraction
}

/// Serde adapter for optional timestamp fields.
pub(crate) fn deserialize_optional<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    parse_datetime(value.as_deref()).map_err(|e| serde::de::Error::custom(e.message().to_string()))
}
