// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Printdesk messaging and status-synchronization
//! engine.
//!
//! This crate provides the canonical entity types, the error taxonomy, the
//! pure order lifecycle state machine, and the adapter traits the rest of
//! the workspace programs against. Store, bus, and sync implementations
//! live in their own crates.

pub mod error;
pub mod lifecycle;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PrintdeskError;
pub use types::{
    Attachment, Message, MessageId, NewMessage, NewOrder, Notification, NotificationId,
    NotificationKind, Order, OrderEvent, OrderEventKind, OrderId, OrderStatus, OrderType,
    ReadCursor, Role, UserId,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    AuthContext, EventBus, EventStream, FileStore, MessageStore, NotificationStore, OrderStore,
    ReadCursorStore, UserContext,
};
