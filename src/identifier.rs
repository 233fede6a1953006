//! # Statement Identifiers ([`identifier`](crate::identifier)) - Deterministic IDs and dates.
//!
//! Every BODS statement the pipeline publishes carries an identifier derived purely from
//! the source record it was built from, so that two runs over the same golden-copy input
//! produce bit-identical output. The derivation is fixed by the downstream consumers and
//! must not change:
//!
//! 1. A *seed* string encodes the source identifier and its revision date (for LEI and
//!    relationship records) or content date (for reporting exceptions).
//! 2. The seed is joined with the statement role as `"{seed}-{role}"`, MD5-hashed, and
//!    the 16 digest bytes are laid out directly as a UUID.
//!
//! The layout is the digest cast as-is — this is deliberately *not* an RFC 4122 name-based
//! UUIDv3 (there is no namespace and the version/variant bits are whatever the digest
//! contains). Wire compatibility requires reproducing the cast exactly.
//!
//! The module also owns the date conventions: statement dates are the `YYYY-MM-DD` part
//! of the source timestamp, while publication and annotation dates use today's date in
//! Europe/London.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Europe::London;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derives the deterministic statement ID for a seed and statement role.
///
/// The ID is the hyphenated textual form of the MD5 digest of `"{seed}-{role}"`
/// interpreted directly as a UUID.
///
/// ```rust
/// use gleif_bods::identifier::statement_id;
///
/// let id = statement_id("213800BJPX8V9HVY1Y11_2023-04-25T13:18:00Z", "entityStatement");
/// assert_eq!(id, "e2d096a9-23d5-ab26-0943-44c62c6a6a98");
/// ```
#[must_use]
pub fn statement_id(seed: &str, role: &str) -> String {
    let digest = md5::compute(format!("{seed}-{role}").as_bytes());
    Uuid::from_bytes(digest.0).to_string()
}

/// Hex SHA-256 digest of an `ExceptionReference`, used to keep reporting-exception
/// seeds bounded in length regardless of the free-text reference.
#[must_use]
pub fn reference_digest(reference: &str) -> String {
    hex::encode(Sha256::digest(reference.as_bytes()))
}

/// Extracts the `YYYY-MM-DD` date component of a source timestamp.
///
/// Source timestamps are RFC 3339 (`2023-04-25T13:18:00Z`, possibly with fractional
/// seconds or an offset); anything unparsable falls back to the text before the `T`.
#[must_use]
pub fn statement_date(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.date_naive().format("%Y-%m-%d").to_string(),
        Err(_) => timestamp
            .split('T')
            .next()
            .unwrap_or(timestamp)
            .to_owned(),
    }
}

/// Today's date in Europe/London as `YYYY-MM-DD`.
///
/// Publication details and annotation creation dates are stamped with the publisher's
/// local date rather than UTC.
#[must_use]
pub fn today_iso() -> String {
    Utc::now().with_timezone(&London).format("%Y-%m-%d").to_string()
}

/// The current date and time in Europe/London as RFC 3339 with second precision.
#[must_use]
pub fn now_iso() -> String {
    Utc::now()
        .with_timezone(&London)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}
