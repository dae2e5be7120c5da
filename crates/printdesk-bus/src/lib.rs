// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process typed event bus for order events.
//!
//! Per-order topics plus a firehose feed, fanned out over bounded mpsc
//! channels. Delivery is best-effort: a subscriber that falls behind its
//! channel capacity loses events, and the sync engine's poll backstop is
//! what restores them. Closed subscribers are pruned on the next publish.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use printdesk_core::traits::bus::{EventBus, EventStream};
use printdesk_core::{OrderEvent, OrderId, PrintdeskError};

/// In-process implementation of [`EventBus`].
///
/// Cheap to clone via `Arc`; one instance is shared by the facade (publish
/// side), the sync engine (per-order topics), and the notification fan-out
/// (firehose).
pub struct OrderBus {
    /// Per-order topic subscribers.
    topics: DashMap<OrderId, Vec<mpsc::Sender<OrderEvent>>>,
    /// Firehose subscribers receiving every order's events.
    firehose: Mutex<Vec<mpsc::Sender<OrderEvent>>>,
    /// Per-subscriber channel capacity.
    capacity: usize,
}

impl OrderBus {
    /// Create a bus with the given per-subscriber channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            firehose: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Number of live subscribers on an order's topic.
    pub fn topic_subscriber_count(&self, order_id: OrderId) -> usize {
        self.topics
            .get(&order_id)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    fn deliver(senders: &mut Vec<mpsc::Sender<OrderEvent>>, event: &OrderEvent) {
        senders.retain(|sender| {
            if sender.is_closed() {
                return false;
            }
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Subscriber is lagging; the event is lost on this
                    // channel and the poll backstop will recover it.
                    warn!(order_id = %event.order_id, "bus subscriber lagging, event dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

impl Default for OrderBus {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl EventBus for OrderBus {
    async fn subscribe(&self, order_id: OrderId) -> Result<EventStream, PrintdeskError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.topics.entry(order_id).or_default().push(tx);
        debug!(%order_id, "bus topic subscription opened");
        Ok(Box::pin(ReceiverEventStream { rx }))
    }

    async fn subscribe_all(&self) -> Result<EventStream, PrintdeskError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.firehose.lock().await.push(tx);
        debug!("bus firehose subscription opened");
        Ok(Box::pin(ReceiverEventStream { rx }))
    }

    async fn publish(&self, event: OrderEvent) -> Result<(), PrintdeskError> {
        let topic_drained = match self.topics.get_mut(&event.order_id) {
            Some(mut senders) => {
                Self::deliver(&mut senders, &event);
                senders.is_empty()
            }
            None => false,
        };
        if topic_drained {
            // Re-checked under the shard lock: a subscriber may have
            // joined between the delivery pass and the removal.
            self.topics.remove_if(&event.order_id, |_, senders| senders.is_empty());
        }
        let mut firehose = self.firehose.lock().await;
        Self::deliver(&mut firehose, &event);
        Ok(())
    }
}

/// Adapts an mpsc receiver to the [`EventStream`] contract.
struct ReceiverEventStream {
    rx: mpsc::Receiver<OrderEvent>,
}

impl Stream for ReceiverEventStream {
    type Item = OrderEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<OrderEvent>> {
        self.rx.poll_recv(cx)
    }
}
