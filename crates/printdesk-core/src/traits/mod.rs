// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators this core
//! depends on: persistence, the push channel, identity, and file storage.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility;
//! components hold `Arc<dyn Trait>` handles.

pub mod auth;
pub mod bus;
pub mod files;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use auth::{AuthContext, UserContext};
pub use bus::{EventBus, EventStream};
pub use files::FileStore;
pub use store::{MessageStore, NotificationStore, OrderStore, ReadCursorStore};
