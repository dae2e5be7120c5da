// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read cursor operations. `advance` enforces forward-only movement at the
//! SQL level, so concurrent mark-read calls from multiple views can never
//! move a cursor backwards.

use chrono::Utc;
use printdesk_core::{MessageId, OrderId, PrintdeskError, ReadCursor, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{format_timestamp, parse_timestamp};

fn row_to_cursor(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadCursor> {
    let updated_at: String = row.get(3)?;
    Ok(ReadCursor {
        order_id: OrderId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        last_read: row.get::<_, Option<i64>>(2)?.map(MessageId),
        updated_at: parse_timestamp(3, &updated_at)?,
    })
}

/// The user's cursor for an order, if one was ever created.
pub async fn get(
    db: &Database,
    order_id: OrderId,
    user_id: UserId,
) -> Result<Option<ReadCursor>, PrintdeskError> {
    db.connection()
        .call(move |conn| {
            let cursor = conn
                .query_row(
                    "SELECT order_id, user_id, last_read, updated_at
                     FROM read_cursors WHERE order_id = ?1 AND user_id = ?2",
                    params![order_id.0, user_id.0],
                    row_to_cursor,
                )
                .optional()?;
            Ok(cursor)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set `last_read = max(current, upto)`, creating the cursor on first
/// touch. A stale `upto` is a no-op.
pub async fn advance(
    db: &Database,
    order_id: OrderId,
    user_id: UserId,
    upto: MessageId,
) -> Result<ReadCursor, PrintdeskError> {
    let now = format_timestamp(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO read_cursors (order_id, user_id, last_read, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (order_id, user_id) DO UPDATE SET
                   last_read = MAX(COALESCE(last_read, 0), excluded.last_read),
                   updated_at = CASE
                     WHEN COALESCE(last_read, 0) < excluded.last_read
                     THEN excluded.updated_at ELSE updated_at END",
                params![order_id.0, user_id.0, upto.0, now],
            )?;
            conn.query_row(
                "SELECT order_id, user_id, last_read, updated_at
                 FROM read_cursors WHERE order_id = ?1 AND user_id = ?2",
                params![order_id.0, user_id.0],
                row_to_cursor,
            )
            .map_err(Into::into)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
