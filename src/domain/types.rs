//! Shared domain enumerations aligned with persisted database enums.
//!
//! The enums themselves live in `chaptrack-api-types` so that the wire format
//! and the Postgres enum labels cannot drift apart.

pub use chaptrack_api_types::{ChapterStatus, ClassLevel, Subject, UnknownVariant};

/// Parse a boolean flag the way query strings and loosely typed payloads carry it.
///
/// Accepts `true`/`false`/`1`/`0`, case-insensitively, with surrounding whitespace ignored.
pub fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
