// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical entity types shared across the Printdesk workspace.
//!
//! External payloads are normalized into these shapes exactly once, at the
//! adapter boundary; every crate above the adapters consumes this single
//! canonical form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PrintdeskError;

/// Unique identifier for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (customer or shop owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-order message sequence number.
///
/// Assigned contiguously (1, 2, 3, ...) by the message store inside its
/// single-writer section. Contiguity is what makes `watermark + 1` gap
/// detection in the sync engine sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    /// The first sequence number assigned in any order.
    pub const FIRST: MessageId = MessageId(1);

    /// The id that would immediately follow this one.
    pub fn next(self) -> MessageId {
        MessageId(self.0 + 1)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant role on an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    ShopOwner,
}

/// Order lifecycle status. Forward movement is one step at a time; the
/// legal moves are encoded in [`crate::lifecycle`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Processing,
    Ready,
    Completed,
}

/// How the order was placed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Upload,
    Walkin,
}

/// Kind of a user-addressed notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    StatusChange,
}

/// An order snapshot.
///
/// Participants are stored as resolved user ids: the upstream system maps a
/// shop to its owning user before this core ever sees the order, so both
/// sides of the conversation are addressable directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub is_urgent: bool,
    pub customer_id: UserId,
    pub shop_owner_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker. Message history survives deletion.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether the order has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether writes (messages, status moves) are shut off.
    pub fn is_terminal(&self) -> bool {
        self.is_deleted() || self.status == OrderStatus::Completed
    }

    /// Both participant user ids.
    pub fn participants(&self) -> [UserId; 2] {
        [self.customer_id, self.shop_owner_id]
    }

    /// Whether the given user is a participant of this order.
    pub fn is_participant(&self, user_id: UserId) -> bool {
        user_id == self.customer_id || user_id == self.shop_owner_id
    }

    /// The other participant, if `user_id` is one of the two.
    pub fn counterpart_of(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.customer_id {
            Some(self.shop_owner_id)
        } else if user_id == self.shop_owner_id {
            Some(self.customer_id)
        } else {
            None
        }
    }

    /// The role a participant holds on this order.
    pub fn role_of(&self, user_id: UserId) -> Option<Role> {
        if user_id == self.customer_id {
            Some(Role::Customer)
        } else if user_id == self.shop_owner_id {
            Some(Role::ShopOwner)
        } else {
            None
        }
    }
}

/// Input for creating an order. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_type: OrderType,
    pub customer_id: UserId,
    pub shop_owner_id: UserId,
    #[serde(default)]
    pub is_urgent: bool,
}

/// An opaque reference to an uploaded file.
///
/// Storage and serving are external; [`crate::traits::FileStore`] resolves a
/// reference to a downloadable URL when a consumer needs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub reference: String,
    pub original_name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// A chat message bound to one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Per-order sequence number, strictly increasing within the order.
    pub id: MessageId,
    pub order_id: OrderId,
    pub sender_id: UserId,
    pub sender_role: Role,
    /// May be empty when attachments are present, never when they are not.
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    /// Users whose read cursor covers this message. Derived from the
    /// read-cursor ledger at query time; the ledger is the source of truth.
    #[serde(default)]
    pub read_by: Vec<UserId>,
}

/// Input for appending a message. Sequence id and timestamp are assigned by
/// the store inside its single-writer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub order_id: OrderId,
    pub sender_id: UserId,
    pub sender_role: Role,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl NewMessage {
    /// Rejects a message with neither content nor attachments.
    pub fn validate(&self) -> Result<(), PrintdeskError> {
        if self.content.trim().is_empty() && self.attachments.is_empty() {
            return Err(PrintdeskError::EmptyMessage);
        }
        Ok(())
    }
}

/// Per-(order, user) pointer to the last message that user has seen.
///
/// `last_read: None` means the user has never opened the order, so every
/// counterpart message counts as unread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadCursor {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub last_read: Option<MessageId>,
    pub updated_at: DateTime<Utc>,
}

impl ReadCursor {
    /// Whether this cursor covers (has read) the given message id.
    pub fn covers(&self, id: MessageId) -> bool {
        self.last_read.is_some_and(|last| last >= id)
    }
}

/// A user-addressed alert, with read state independent of the chat ledger.
///
/// The notification bell and the chat unread badge serve different purposes:
/// marking a notification read says nothing about the chat cursor, and
/// opening a chat does not clear the bell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub order_id: OrderId,
    /// How many events this row stands for. Message bursts against an
    /// already-unread row bump the count instead of inserting a new row.
    pub coalesced_count: u32,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event published on the order bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub kind: OrderEventKind,
}

/// Payload of an [`OrderEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum OrderEventKind {
    /// A message was appended to the order's log.
    MessageCreated { message: Message },
    /// The order moved between lifecycle states.
    StatusChanged {
        from: OrderStatus,
        to: OrderStatus,
        actor_role: Role,
    },
}

impl OrderEvent {
    pub fn message_created(message: Message) -> Self {
        Self {
            order_id: message.order_id,
            kind: OrderEventKind::MessageCreated { message },
        }
    }

    pub fn status_changed(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        actor_role: Role,
    ) -> Self {
        Self {
            order_id,
            kind: OrderEventKind::StatusChanged {
                from,
                to,
                actor_role,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn order() -> Order {
        Order {
            id: OrderId(1),
            order_type: OrderType::Upload,
            status: OrderStatus::New,
            is_urgent: false,
            customer_id: UserId(10),
            shop_owner_id: UserId(20),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for status in [
            OrderStatus::New,
            OrderStatus::Processing,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ] {
            let s = status.to_string();
            assert_eq!(OrderStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(Role::ShopOwner.to_string(), "shop_owner");
        assert_eq!(NotificationKind::NewMessage.to_string(), "new_message");
        assert_eq!(OrderType::Walkin.to_string(), "walkin");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&MessageId(7)).unwrap();
        assert_eq!(json, "7");
        let back: MessageId = serde_json::from_str("7").unwrap();
        assert_eq!(back, MessageId(7));
    }

    #[test]
    fn counterpart_and_roles() {
        let order = order();
        assert_eq!(order.counterpart_of(UserId(10)), Some(UserId(20)));
        assert_eq!(order.counterpart_of(UserId(20)), Some(UserId(10)));
        assert_eq!(order.counterpart_of(UserId(99)), None);
        assert_eq!(order.role_of(UserId(10)), Some(Role::Customer));
        assert_eq!(order.role_of(UserId(20)), Some(Role::ShopOwner));
        assert!(order.is_participant(UserId(10)));
        assert!(!order.is_participant(UserId(99)));
    }

    #[test]
    fn terminal_means_completed_or_deleted() {
        let mut order = order();
        assert!(!order.is_terminal());
        order.status = OrderStatus::Completed;
        assert!(order.is_terminal());
        order.status = OrderStatus::Ready;
        order.deleted_at = Some(Utc::now());
        assert!(order.is_terminal());
    }

    #[test]
    fn empty_message_is_rejected() {
        let msg = NewMessage {
            order_id: OrderId(1),
            sender_id: UserId(10),
            sender_role: Role::Customer,
            content: "   ".into(),
            attachments: vec![],
        };
        assert!(matches!(msg.validate(), Err(PrintdeskError::EmptyMessage)));
    }

    #[test]
    fn attachment_only_message_is_valid() {
        let msg = NewMessage {
            order_id: OrderId(1),
            sender_id: UserId(10),
            sender_role: Role::Customer,
            content: String::new(),
            attachments: vec![Attachment {
                reference: "uploads/abc123.pdf".into(),
                original_name: "thesis.pdf".into(),
                mime_type: Some("application/pdf".into()),
                size_bytes: Some(52_000),
            }],
        };
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn cursor_coverage() {
        let cursor = ReadCursor {
            order_id: OrderId(1),
            user_id: UserId(10),
            last_read: Some(MessageId(3)),
            updated_at: Utc::now(),
        };
        assert!(cursor.covers(MessageId(3)));
        assert!(cursor.covers(MessageId(1)));
        assert!(!cursor.covers(MessageId(4)));

        let fresh = ReadCursor {
            last_read: None,
            ..cursor
        };
        assert!(!fresh.covers(MessageId(1)));
    }
}
