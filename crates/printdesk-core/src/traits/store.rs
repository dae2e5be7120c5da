// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store traits for orders, messages, read cursors, and notifications.
//!
//! The message store's consistency contract is part of this design even
//! though the backing engine is opaque: messages within an order are
//! totally ordered by a contiguous sequence id, and `list_since` is
//! idempotent, returning the same set for the same cursor until new
//! messages arrive.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::PrintdeskError;
use crate::types::{
    Message, MessageId, NewMessage, NewOrder, Notification, NotificationId, NotificationKind,
    Order, OrderId, ReadCursor, UserId,
};

/// Append-only per-order message log.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Append a message, assigning the next per-order sequence id and the
    /// creation timestamp atomically.
    ///
    /// Lifecycle gating (`ensure_writable`) and content validation happen
    /// in the calling layer before this is reached; the store only
    /// persists.
    async fn append(&self, message: NewMessage) -> Result<Message, PrintdeskError>;

    /// Messages with id strictly greater than `cursor`, oldest first.
    /// `cursor = None` returns the order's full visible history.
    async fn list_since(
        &self,
        order_id: OrderId,
        cursor: Option<MessageId>,
    ) -> Result<Vec<Message>, PrintdeskError>;

    /// The highest message id in the order, if any messages exist.
    async fn latest_id(&self, order_id: OrderId) -> Result<Option<MessageId>, PrintdeskError>;

    /// Counterpart messages above the user's read cursor.
    async fn unread_count(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<u64, PrintdeskError>;

    /// Batched unread counts for list views. One grouped query: O(orders)
    /// round trips, never O(orders x messages). Orders with no unread
    /// messages map to zero.
    async fn unread_counts(
        &self,
        user_id: UserId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, u64>, PrintdeskError>;
}

/// Order snapshot persistence.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Create an order in `new` status with a fresh id.
    async fn create(&self, order: NewOrder) -> Result<Order, PrintdeskError>;

    /// Fetch a snapshot. `NotFound` if the id does not exist.
    async fn get(&self, order_id: OrderId) -> Result<Order, PrintdeskError>;

    /// Persist a snapshot produced by the lifecycle state machine.
    async fn update(&self, order: &Order) -> Result<(), PrintdeskError>;

    /// Orders the user participates in, newest first. Soft-deleted orders
    /// are excluded unless `include_deleted` (the history view) asks for
    /// them.
    async fn list_for_user(
        &self,
        user_id: UserId,
        include_deleted: bool,
    ) -> Result<Vec<Order>, PrintdeskError>;
}

/// Per-(order, user) read cursor persistence.
///
/// The cursor only ever moves forward; `advance` with a stale id is a
/// no-op, not an error.
#[async_trait]
pub trait ReadCursorStore: Send + Sync + 'static {
    /// The user's cursor for an order, if one was ever created.
    async fn get(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<ReadCursor>, PrintdeskError>;

    /// Set `last_read = max(current, upto)`, creating the cursor on first
    /// touch. Returns the resulting cursor.
    async fn advance(
        &self,
        order_id: OrderId,
        user_id: UserId,
        upto: MessageId,
    ) -> Result<ReadCursor, PrintdeskError>;
}

/// User-addressed notification rows with their own read state.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Insert a notification row (used for `status_change`).
    async fn insert(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        order_id: OrderId,
    ) -> Result<Notification, PrintdeskError>;

    /// Burst-suppressing insert for `new_message`: if an unread
    /// `new_message` row already exists for (user, order), bump its
    /// coalesced count instead of inserting a duplicate.
    async fn coalesce_message(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Notification, PrintdeskError>;

    /// All notifications for the user, newest activity first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, PrintdeskError>;

    /// Unread notification rows for the user (bell badge).
    async fn unread_count(&self, user_id: UserId) -> Result<u64, PrintdeskError>;

    /// Mark one of the user's notifications read. `NotFound` if the id
    /// does not exist or belongs to another user.
    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<(), PrintdeskError>;

    /// Delete one of the user's notifications. `NotFound` if the id
    /// does not exist or belongs to another user.
    async fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), PrintdeskError>;
}
