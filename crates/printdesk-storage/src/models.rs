// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row conversion helpers between SQLite columns and the canonical types.
//!
//! The canonical entity types live in `printdesk-core::types`; this module
//! only handles the TEXT encodings SQLite stores them under (RFC 3339
//! timestamps, snake_case enum strings, JSON attachment lists).

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use printdesk_core::Attachment;
use rusqlite::types::Type;

/// Format a timestamp the way every table stores it.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp. `idx` is the column index, for error
/// attribution.
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a stored enum string (snake_case via strum).
pub(crate) fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = strum::ParseError>,
{
    T::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse the JSON attachments column.
pub(crate) fn parse_attachments(idx: usize, raw: &str) -> rusqlite::Result<Vec<Attachment>> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Encode attachments for storage.
pub(crate) fn encode_attachments(attachments: &[Attachment]) -> rusqlite::Result<String> {
    serde_json::to_string(attachments)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
