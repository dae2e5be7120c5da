// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event bus with fault injection for sync-engine tests.
//!
//! Wraps the real in-process [`OrderBus`] and lets a test make
//! `subscribe` fail (poll-only degradation) or silently swallow the
//! next N publishes (push gaps).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use printdesk_bus::OrderBus;
use printdesk_core::{EventBus, EventStream, OrderEvent, OrderId, PrintdeskError};

pub struct MockBus {
    inner: OrderBus,
    subscribe_down: AtomicBool,
    drop_next_publishes: AtomicUsize,
}

impl MockBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: OrderBus::new(capacity),
            subscribe_down: AtomicBool::new(false),
            drop_next_publishes: AtomicUsize::new(0),
        }
    }

    /// While set, `subscribe` fails with `TransportUnavailable`.
    pub fn set_subscribe_down(&self, down: bool) {
        self.subscribe_down.store(down, Ordering::SeqCst);
    }

    /// Swallow the next `n` publishes, simulating lost push events. The
    /// store still has the messages; only their push delivery vanishes.
    pub fn drop_next_publishes(&self, n: usize) {
        self.drop_next_publishes.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventBus for MockBus {
    async fn subscribe(&self, order_id: OrderId) -> Result<EventStream, PrintdeskError> {
        if self.subscribe_down.load(Ordering::SeqCst) {
            return Err(PrintdeskError::TransportUnavailable {
                message: "push channel down (injected)".into(),
            });
        }
        self.inner.subscribe(order_id).await
    }

    async fn subscribe_all(&self) -> Result<EventStream, PrintdeskError> {
        if self.subscribe_down.load(Ordering::SeqCst) {
            return Err(PrintdeskError::TransportUnavailable {
                message: "push channel down (injected)".into(),
            });
        }
        self.inner.subscribe_all().await
    }

    async fn publish(&self, event: OrderEvent) -> Result<(), PrintdeskError> {
        let remaining = self.drop_next_publishes.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .drop_next_publishes
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Ok(());
        }
        self.inner.publish(event).await
    }
}
