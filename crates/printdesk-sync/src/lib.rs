// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time synchronization of order chat views.
//!
//! Push events are a latency optimization, never a correctness
//! mechanism: the poll backstop plus per-order contiguous message ids
//! guarantee that a view converges on the store's history even when the
//! push channel drops, reorders, or redelivers events, or is down
//! entirely.

mod backoff;
mod engine;
mod reconcile;
mod subscription;

pub use engine::SyncEngine;
pub use reconcile::{Applied, Reconciler};
pub use subscription::{OrderSubscription, SubscriptionSeed, SyncUpdate};
