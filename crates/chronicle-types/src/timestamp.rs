//! the `created` timestamp format.
//!
//! `created` is hashed as a string, so it has to be rendered exactly once and
//! then stored verbatim. chronicle renders whole-second rfc3339 in utc with a
//! numeric offset, e.g. `2026-03-01T12:00:00+00:00`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::Error;

/// render a `created` timestamp.
pub fn format_created(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// parse any rfc3339 timestamp, including ones rendered by peers.
pub fn parse_created(created: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(created)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp(format!("{}: {}", created, e)))
}
