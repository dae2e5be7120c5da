// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order CRUD operations.

use chrono::Utc;
use printdesk_core::{NewOrder, Order, OrderId, OrderStatus, PrintdeskError, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{format_timestamp, parse_enum, parse_timestamp};

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let order_type: String = row.get(1)?;
    let status: String = row.get(2)?;
    let created_at: String = row.get(6)?;
    let deleted_at: Option<String> = row.get(7)?;
    Ok(Order {
        id: OrderId(row.get(0)?),
        order_type: parse_enum(1, &order_type)?,
        status: parse_enum(2, &status)?,
        is_urgent: row.get(3)?,
        customer_id: UserId(row.get(4)?),
        shop_owner_id: UserId(row.get(5)?),
        created_at: parse_timestamp(6, &created_at)?,
        deleted_at: deleted_at
            .map(|raw| parse_timestamp(7, &raw))
            .transpose()?,
    })
}

const ORDER_COLUMNS: &str =
    "id, order_type, status, is_urgent, customer_id, shop_owner_id, created_at, deleted_at";

/// Insert a new order in `new` status and return the stored snapshot.
pub async fn create(db: &Database, new: NewOrder) -> Result<Order, PrintdeskError> {
    let created_at = Utc::now();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO orders (order_type, status, is_urgent, customer_id, shop_owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.order_type.to_string(),
                    OrderStatus::New.to_string(),
                    new.is_urgent,
                    new.customer_id.0,
                    new.shop_owner_id.0,
                    format_timestamp(created_at),
                ],
            )?;
            Ok(Order {
                id: OrderId(conn.last_insert_rowid()),
                order_type: new.order_type,
                status: OrderStatus::New,
                is_urgent: new.is_urgent,
                customer_id: new.customer_id,
                shop_owner_id: new.shop_owner_id,
                created_at,
                deleted_at: None,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one order snapshot.
pub async fn get(db: &Database, order_id: OrderId) -> Result<Order, PrintdeskError> {
    let found = db
        .connection()
        .call(move |conn| {
            let order = conn
                .query_row(
                    &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                    params![order_id.0],
                    row_to_order,
                )
                .optional()?;
            Ok(order)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    found.ok_or(PrintdeskError::NotFound {
        entity: "order",
        id: order_id.0,
    })
}

/// Persist a lifecycle snapshot over the existing row.
pub async fn update(db: &Database, order: &Order) -> Result<(), PrintdeskError> {
    let order = order.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = ?2, is_urgent = ?3, deleted_at = ?4 WHERE id = ?1",
                params![
                    order.id.0,
                    order.status.to_string(),
                    order.is_urgent,
                    order.deleted_at.map(format_timestamp),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(PrintdeskError::NotFound {
            entity: "order",
            id: order.id.0,
        });
    }
    Ok(())
}

/// Orders the user participates in, newest first.
pub async fn list_for_user(
    db: &Database,
    user_id: UserId,
    include_deleted: bool,
) -> Result<Vec<Order>, PrintdeskError> {
    db.connection()
        .call(move |conn| {
            let filter = if include_deleted {
                ""
            } else {
                "AND deleted_at IS NULL"
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE (customer_id = ?1 OR shop_owner_id = ?1) {filter}
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![user_id.0], row_to_order)?;
            let mut orders = Vec::new();
            for row in rows {
                orders.push(row?);
            }
            Ok(orders)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
