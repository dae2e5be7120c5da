// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event bus trait for the push side of synchronization.
//!
//! The bus is best-effort: it may drop, reorder, or redeliver events, and
//! `subscribe` may fail outright. The sync engine treats it purely as a
//! latency optimization over polling, so none of those failures affect
//! correctness.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::PrintdeskError;
use crate::types::{OrderEvent, OrderId};

/// A stream of order events from a bus subscription. The stream ends when
/// the subscription is dropped on the bus side.
pub type EventStream = Pin<Box<dyn Stream<Item = OrderEvent> + Send>>;

/// Push channel for message-created and status-changed events.
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Subscribe to one order's event topic.
    ///
    /// Fails with `TransportUnavailable` when the push channel cannot be
    /// established; callers fall back to polling and retry with backoff.
    async fn subscribe(&self, order_id: OrderId) -> Result<EventStream, PrintdeskError>;

    /// Subscribe to every order's events (the notification fan-out's feed).
    async fn subscribe_all(&self) -> Result<EventStream, PrintdeskError>;

    /// Publish an event to the order's topic and the firehose.
    async fn publish(&self, event: OrderEvent) -> Result<(), PrintdeskError>;
}
