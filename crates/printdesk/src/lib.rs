// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Printdesk: order-scoped messaging and status synchronization.
//!
//! The core behind a print-shop app's chat: an append-only per-order
//! message log, a forward-only read ledger, a push+poll sync engine
//! with gap-free delivery, notification fan-out with burst coalescing,
//! and the order lifecycle state machine gating all writes.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use printdesk::{Printdesk, PrintdeskConfig};
//! use printdesk_core::{AuthContext, UserContext, Role, UserId};
//!
//! struct Session;
//! impl AuthContext for Session {
//!     fn current_user(&self) -> UserContext {
//!         UserContext { id: UserId(10), role: Role::Customer }
//!     }
//! }
//!
//! # async fn run() -> Result<(), printdesk_core::PrintdeskError> {
//! let service = Printdesk::builder()
//!     .with_config(PrintdeskConfig::default())
//!     .with_auth(Arc::new(Session))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod service;

pub use printdesk_config::PrintdeskConfig;
pub use printdesk_core::{
    Attachment, Message, MessageId, NewMessage, NewOrder, Notification, NotificationId,
    NotificationKind, Order, OrderId, OrderStatus, OrderType, PrintdeskError, Role, UserId,
};
pub use printdesk_sync::{OrderSubscription, SubscriptionSeed, SyncUpdate};
pub use service::{Printdesk, PrintdeskBuilder};
