// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared read/unread ledger.
//!
//! One [`ReadLedger`] instance is shared (via `Arc`) by every view a user
//! has open -- the floating chat widget and the full chat modal for the
//! same order advance the same cursor, so marking read in one view is
//! immediately visible in the other's badge count. Two independent
//! in-memory copies that can drift is exactly the failure mode this
//! consolidation removes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use printdesk_core::{
    MessageId, MessageStore, OrderId, PrintdeskError, ReadCursor, ReadCursorStore, UserId,
};

/// Per-(order, user) read position tracking and unread-count math.
///
/// All state lives in the backing stores; the ledger itself is stateless
/// and cheap to share.
pub struct ReadLedger {
    cursors: Arc<dyn ReadCursorStore>,
    messages: Arc<dyn MessageStore>,
}

impl ReadLedger {
    pub fn new(cursors: Arc<dyn ReadCursorStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self { cursors, messages }
    }

    /// Advance the user's cursor to `upto`. Stale positions are a no-op,
    /// never an error: the cursor only moves forward.
    pub async fn mark_read(
        &self,
        order_id: OrderId,
        user_id: UserId,
        upto: MessageId,
    ) -> Result<ReadCursor, PrintdeskError> {
        let cursor = self.cursors.advance(order_id, user_id, upto).await?;
        debug!(%order_id, %user_id, %upto, last_read = ?cursor.last_read, "cursor advanced");
        Ok(cursor)
    }

    /// Advance the user's cursor to the order's newest message. No-op on
    /// an order with no messages yet.
    pub async fn mark_order_read(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<ReadCursor>, PrintdeskError> {
        match self.messages.latest_id(order_id).await? {
            Some(latest) => Ok(Some(self.mark_read(order_id, user_id, latest).await?)),
            None => Ok(None),
        }
    }

    /// The user's cursor for an order, if they have ever opened it.
    pub async fn cursor(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<ReadCursor>, PrintdeskError> {
        self.cursors.get(order_id, user_id).await
    }

    /// Counterpart messages above the user's cursor. A user who has never
    /// opened the order sees every counterpart message as unread.
    pub async fn unread_count(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<u64, PrintdeskError> {
        self.messages.unread_count(order_id, user_id).await
    }

    /// Batched unread counts for order-list views.
    pub async fn unread_counts(
        &self,
        user_id: UserId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, u64>, PrintdeskError> {
        self.messages.unread_counts(user_id, order_ids).await
    }
}
