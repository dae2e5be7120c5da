// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.
//!
//! `append` assigns the next per-order sequence number inside the single
//! writer, so sequence ids are contiguous per order even under concurrent
//! senders. `read_by` on returned messages is derived from the
//! `read_cursors` table at query time; the ledger stays the single source
//! of truth for read state.

use std::collections::HashMap;

use chrono::Utc;
use printdesk_core::{Message, MessageId, NewMessage, OrderId, PrintdeskError, UserId};
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::Database;
use crate::models::{
    encode_attachments, format_timestamp, parse_attachments, parse_enum, parse_timestamp,
};

/// Append a message, assigning the next sequence id for its order.
pub async fn append(db: &Database, new: NewMessage) -> Result<Message, PrintdeskError> {
    let created_at = Utc::now();
    db.connection()
        .call(move |conn| {
            let attachments = encode_attachments(&new.attachments)?;
            let seq: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE order_id = ?1",
                params![new.order_id.0],
                |row| row.get(0),
            )?;
            conn.execute(
                "INSERT INTO messages (order_id, seq, sender_id, sender_role, content, attachments, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.order_id.0,
                    seq,
                    new.sender_id.0,
                    new.sender_role.to_string(),
                    new.content,
                    attachments,
                    format_timestamp(created_at),
                ],
            )?;
            Ok(Message {
                id: MessageId(seq),
                order_id: new.order_id,
                sender_id: new.sender_id,
                sender_role: new.sender_role,
                content: new.content,
                attachments: new.attachments,
                created_at,
                read_by: Vec::new(),
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages with id strictly greater than `cursor`, oldest first, with
/// `read_by` populated from the order's read cursors.
pub async fn list_since(
    db: &Database,
    order_id: OrderId,
    cursor: Option<MessageId>,
) -> Result<Vec<Message>, PrintdeskError> {
    let after = cursor.map(|c| c.0).unwrap_or(0);
    db.connection()
        .call(move |conn| {
            // Cursors first: read_by is derived per message below.
            let mut cursor_stmt = conn.prepare(
                "SELECT user_id, last_read FROM read_cursors
                 WHERE order_id = ?1 AND last_read IS NOT NULL",
            )?;
            let cursors: Vec<(i64, i64)> = cursor_stmt
                .query_map(params![order_id.0], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<rusqlite::Result<_>>()?;

            let mut stmt = conn.prepare(
                "SELECT seq, sender_id, sender_role, content, attachments, created_at
                 FROM messages WHERE order_id = ?1 AND seq > ?2
                 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![order_id.0, after], |row| {
                let sender_role: String = row.get(2)?;
                let attachments: String = row.get(4)?;
                let created_at: String = row.get(5)?;
                let seq: i64 = row.get(0)?;
                Ok(Message {
                    id: MessageId(seq),
                    order_id,
                    sender_id: UserId(row.get(1)?),
                    sender_role: parse_enum(2, &sender_role)?,
                    content: row.get(3)?,
                    attachments: parse_attachments(4, &attachments)?,
                    created_at: parse_timestamp(5, &created_at)?,
                    read_by: cursors
                        .iter()
                        .filter(|(_, last_read)| *last_read >= seq)
                        .map(|(user_id, _)| UserId(*user_id))
                        .collect(),
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The highest message id in the order, if any.
pub async fn latest_id(
    db: &Database,
    order_id: OrderId,
) -> Result<Option<MessageId>, PrintdeskError> {
    db.connection()
        .call(move |conn| {
            let seq: Option<i64> = conn
                .query_row(
                    "SELECT MAX(seq) FROM messages WHERE order_id = ?1",
                    params![order_id.0],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();
            Ok(seq.map(MessageId))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counterpart messages above the user's read cursor for one order.
pub async fn unread_count(
    db: &Database,
    order_id: OrderId,
    user_id: UserId,
) -> Result<u64, PrintdeskError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages m
                 WHERE m.order_id = ?1 AND m.sender_id != ?2
                   AND m.seq > COALESCE(
                       (SELECT last_read FROM read_cursors
                        WHERE order_id = ?1 AND user_id = ?2), 0)",
                params![order_id.0, user_id.0],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Batched unread counts for list views: one grouped query for all the
/// given orders. Orders with nothing unread map to zero.
pub async fn unread_counts(
    db: &Database,
    user_id: UserId,
    order_ids: &[OrderId],
) -> Result<HashMap<OrderId, u64>, PrintdeskError> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let order_ids = order_ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = (0..order_ids.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT m.order_id, COUNT(*) FROM messages m
                 LEFT JOIN read_cursors rc
                   ON rc.order_id = m.order_id AND rc.user_id = ?1
                 WHERE m.sender_id != ?1
                   AND m.seq > COALESCE(rc.last_read, 0)
                   AND m.order_id IN ({placeholders})
                 GROUP BY m.order_id"
            ))?;
            let bound = std::iter::once(user_id.0).chain(order_ids.iter().map(|o| o.0));
            let rows = stmt.query_map(params_from_iter(bound), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts: HashMap<OrderId, u64> =
                order_ids.iter().map(|id| (*id, 0)).collect();
            for row in rows {
                let (order_id, count) = row?;
                counts.insert(OrderId(order_id), count as u64);
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::cursors;
    use crate::queries::testutil::{open_test_db, seed_order};
    use printdesk_core::Role;

    fn text_message(order_id: OrderId, sender: UserId, role: Role, content: &str) -> NewMessage {
        NewMessage {
            order_id,
            sender_id: sender,
            sender_role: role,
            content: content.into(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn append_assigns_contiguous_sequence_ids() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;

        for expected in 1..=3 {
            let msg = append(
                &db,
                text_message(order.id, UserId(10), Role::Customer, "hi"),
            )
            .await
            .unwrap();
            assert_eq!(msg.id, MessageId(expected));
        }

        // Sequences are per order, not global.
        let other = seed_order(&db).await;
        let msg = append(
            &db,
            text_message(other.id, UserId(10), Role::Customer, "hi"),
        )
        .await
        .unwrap();
        assert_eq!(msg.id, MessageId(1));
    }

    #[tokio::test]
    async fn append_then_full_list_contains_it_exactly_once() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        let sent = append(
            &db,
            text_message(order.id, UserId(10), Role::Customer, "hello"),
        )
        .await
        .unwrap();

        let listed = list_since(&db, order.id, None).await.unwrap();
        let matching: Vec<_> = listed.iter().filter(|m| m.id == sent.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].content, "hello");
    }

    #[tokio::test]
    async fn list_since_is_exclusive_and_idempotent() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        for i in 1..=5 {
            append(
                &db,
                text_message(order.id, UserId(10), Role::Customer, &format!("m{i}")),
            )
            .await
            .unwrap();
        }

        let tail = list_since(&db, order.id, Some(MessageId(3))).await.unwrap();
        assert_eq!(
            tail.iter().map(|m| m.id.0).collect::<Vec<_>>(),
            vec![4, 5]
        );

        // Same cursor, same result, until new messages arrive.
        let again = list_since(&db, order.id, Some(MessageId(3))).await.unwrap();
        assert_eq!(tail, again);
    }

    #[tokio::test]
    async fn read_by_is_derived_from_cursors() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        for _ in 0..3 {
            append(
                &db,
                text_message(order.id, UserId(10), Role::Customer, "hi"),
            )
            .await
            .unwrap();
        }
        cursors::advance(&db, order.id, UserId(20), MessageId(2))
            .await
            .unwrap();

        let listed = list_since(&db, order.id, None).await.unwrap();
        assert_eq!(listed[0].read_by, vec![UserId(20)]);
        assert_eq!(listed[1].read_by, vec![UserId(20)]);
        assert!(listed[2].read_by.is_empty());
    }

    #[tokio::test]
    async fn unread_count_ignores_own_messages() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        append(&db, text_message(order.id, UserId(10), Role::Customer, "a"))
            .await
            .unwrap();
        append(&db, text_message(order.id, UserId(20), Role::ShopOwner, "b"))
            .await
            .unwrap();

        // Never-opened order: every counterpart message is unread.
        assert_eq!(unread_count(&db, order.id, UserId(10)).await.unwrap(), 1);
        assert_eq!(unread_count(&db, order.id, UserId(20)).await.unwrap(), 1);

        cursors::advance(&db, order.id, UserId(10), MessageId(2))
            .await
            .unwrap();
        assert_eq!(unread_count(&db, order.id, UserId(10)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn batched_unread_counts_cover_all_requested_orders() {
        let (db, _dir) = open_test_db().await;
        let busy = seed_order(&db).await;
        let quiet = seed_order(&db).await;
        for _ in 0..4 {
            append(&db, text_message(busy.id, UserId(20), Role::ShopOwner, "x"))
                .await
                .unwrap();
        }

        let counts = unread_counts(&db, UserId(10), &[busy.id, quiet.id])
            .await
            .unwrap();
        assert_eq!(counts[&busy.id], 4);
        assert_eq!(counts[&quiet.id], 0);

        assert!(unread_counts(&db, UserId(10), &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_id_tracks_the_tail() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        assert_eq!(latest_id(&db, order.id).await.unwrap(), None);

        append(&db, text_message(order.id, UserId(10), Role::Customer, "a"))
            .await
            .unwrap();
        append(&db, text_message(order.id, UserId(10), Role::Customer, "b"))
            .await
            .unwrap();
        assert_eq!(latest_id(&db, order.id).await.unwrap(), Some(MessageId(2)));
    }
}
