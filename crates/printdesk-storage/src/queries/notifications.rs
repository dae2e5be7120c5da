// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification row operations, including burst coalescing.

use chrono::Utc;
use printdesk_core::{
    Notification, NotificationId, NotificationKind, OrderId, PrintdeskError, UserId,
};
use rusqlite::params;

use crate::database::Database;
use crate::models::{format_timestamp, parse_enum, parse_timestamp};

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        kind: parse_enum(2, &kind)?,
        order_id: OrderId(row.get(3)?),
        coalesced_count: row.get::<_, i64>(4)? as u32,
        is_read: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, order_id, coalesced_count, is_read, created_at, updated_at";

/// Insert a notification row unconditionally.
pub async fn insert(
    db: &Database,
    user_id: UserId,
    kind: NotificationKind,
    order_id: OrderId,
) -> Result<Notification, PrintdeskError> {
    let now = Utc::now();
    db.connection()
        .call(move |conn| {
            let stamp = format_timestamp(now);
            conn.execute(
                "INSERT INTO notifications (user_id, kind, order_id, coalesced_count, is_read, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, 0, ?4, ?4)",
                params![user_id.0, kind.to_string(), order_id.0, stamp],
            )?;
            Ok(Notification {
                id: NotificationId(conn.last_insert_rowid()),
                user_id,
                kind,
                order_id,
                coalesced_count: 1,
                is_read: false,
                created_at: now,
                updated_at: now,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Burst-suppressing insert for `new_message`: bump the unread row for
/// (user, order) if one exists, insert otherwise. Returns the resulting row.
pub async fn coalesce_message(
    db: &Database,
    user_id: UserId,
    order_id: OrderId,
) -> Result<Notification, PrintdeskError> {
    let now = Utc::now();
    db.connection()
        .call(move |conn| {
            let stamp = format_timestamp(now);
            let kind = NotificationKind::NewMessage.to_string();
            let bumped = conn.execute(
                "UPDATE notifications
                 SET coalesced_count = coalesced_count + 1, updated_at = ?4
                 WHERE user_id = ?1 AND order_id = ?2 AND kind = ?3 AND is_read = 0",
                params![user_id.0, order_id.0, kind, stamp],
            )?;
            if bumped == 0 {
                conn.execute(
                    "INSERT INTO notifications (user_id, kind, order_id, coalesced_count, is_read, created_at, updated_at)
                     VALUES (?1, ?2, ?3, 1, 0, ?4, ?4)",
                    params![user_id.0, kind, order_id.0, stamp],
                )?;
            }
            conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE user_id = ?1 AND order_id = ?2 AND kind = ?3 AND is_read = 0"
                ),
                params![user_id.0, order_id.0, NotificationKind::NewMessage.to_string()],
                row_to_notification,
            )
            .map_err(Into::into)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All notifications for the user, newest activity first.
pub async fn list_for_user(
    db: &Database,
    user_id: UserId,
) -> Result<Vec<Notification>, PrintdeskError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1 ORDER BY updated_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![user_id.0], row_to_notification)?;
            let mut notifications = Vec::new();
            for row in rows {
                notifications.push(row?);
            }
            Ok(notifications)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Unread rows for the user's bell badge.
pub async fn unread_count(db: &Database, user_id: UserId) -> Result<u64, PrintdeskError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                params![user_id.0],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark one of the user's notifications read. Scoping by owner in the
/// predicate keeps a foreign id indistinguishable from a missing one.
pub async fn mark_read(
    db: &Database,
    user_id: UserId,
    id: NotificationId,
) -> Result<(), PrintdeskError> {
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id.0, user_id.0],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(PrintdeskError::NotFound {
            entity: "notification",
            id: id.0,
        });
    }
    Ok(())
}

/// Delete one of the user's notification rows.
pub async fn delete(
    db: &Database,
    user_id: UserId,
    id: NotificationId,
) -> Result<(), PrintdeskError> {
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                params![id.0, user_id.0],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(PrintdeskError::NotFound {
            entity: "notification",
            id: id.0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil::{open_test_db, seed_order};

    #[tokio::test]
    async fn coalesce_bumps_instead_of_duplicating() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;

        for _ in 0..5 {
            coalesce_message(&db, UserId(20), order.id).await.unwrap();
        }

        let rows = list_for_user(&db, UserId(20)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].coalesced_count, 5);
        assert!(!rows[0].is_read);
    }

    #[tokio::test]
    async fn coalescing_stops_at_the_read_boundary() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;

        let first = coalesce_message(&db, UserId(20), order.id).await.unwrap();
        mark_read(&db, UserId(20), first.id).await.unwrap();

        // A new burst after mark-read starts a fresh row.
        let second = coalesce_message(&db, UserId(20), order.id).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.coalesced_count, 1);
        assert_eq!(list_for_user(&db, UserId(20)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn status_change_rows_are_never_coalesced() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;

        insert(&db, UserId(10), NotificationKind::StatusChange, order.id)
            .await
            .unwrap();
        insert(&db, UserId(10), NotificationKind::StatusChange, order.id)
            .await
            .unwrap();
        assert_eq!(list_for_user(&db, UserId(10)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unread_badge_and_mark_read() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;

        let n1 = insert(&db, UserId(10), NotificationKind::StatusChange, order.id)
            .await
            .unwrap();
        coalesce_message(&db, UserId(10), order.id).await.unwrap();
        assert_eq!(unread_count(&db, UserId(10)).await.unwrap(), 2);

        mark_read(&db, UserId(10), n1.id).await.unwrap();
        assert_eq!(unread_count(&db, UserId(10)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let (db, _dir) = open_test_db().await;
        assert!(matches!(
            mark_read(&db, UserId(10), NotificationId(404)).await.unwrap_err(),
            PrintdeskError::NotFound { .. }
        ));
        assert!(matches!(
            delete(&db, UserId(10), NotificationId(404)).await.unwrap_err(),
            PrintdeskError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn other_users_rows_are_out_of_reach() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        let n = insert(&db, UserId(10), NotificationKind::StatusChange, order.id)
            .await
            .unwrap();

        assert!(matches!(
            mark_read(&db, UserId(20), n.id).await.unwrap_err(),
            PrintdeskError::NotFound { .. }
        ));
        assert!(matches!(
            delete(&db, UserId(20), n.id).await.unwrap_err(),
            PrintdeskError::NotFound { .. }
        ));
        assert_eq!(unread_count(&db, UserId(10)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let (db, _dir) = open_test_db().await;
        let order = seed_order(&db).await;
        let n = insert(&db, UserId(10), NotificationKind::StatusChange, order.id)
            .await
            .unwrap();
        delete(&db, UserId(10), n.id).await.unwrap();
        assert!(list_for_user(&db, UserId(10)).await.unwrap().is_empty());
    }
}
