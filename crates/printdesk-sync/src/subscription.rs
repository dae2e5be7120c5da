// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription handles given to views.
//!
//! Several views of the same order (floating widget, full modal) share
//! one sync actor; each holds its own [`OrderSubscription`]. The handle
//! filters the shared broadcast down to a per-view exactly-once feed,
//! and its drop releases the actor's reference count.

use printdesk_core::{Message, MessageId, Order, OrderId};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::engine::SharedRegistry;

/// A change delivered to a live subscription.
#[derive(Debug, Clone)]
pub enum SyncUpdate {
    /// A new message, delivered in contiguous id order.
    Message(Message),
    /// The order snapshot changed (status, urgency, or deletion).
    Status(Order),
    /// Consistency was lost; the view should show a reconnecting state
    /// until the following [`SyncUpdate::Resynced`] arrives.
    Reconnecting,
    /// A rebuilt full view. Replaces all previously delivered messages.
    Resynced { messages: Vec<Message>, order: Order },
}

/// Initial state captured when the subscription was opened. Rendered
/// immediately; later updates extend it.
#[derive(Debug, Clone)]
pub struct SubscriptionSeed {
    pub order: Order,
    pub messages: Vec<Message>,
    pub unread_count: u64,
}

/// Instructions from a view handle to its order's sync actor.
#[derive(Debug)]
pub(crate) enum ActorCommand {
    /// A second (or later) view attached to the shared actor.
    ViewOpened,
    /// A view went invisible; its share of polling pauses.
    ViewSuspended,
    ViewResumed,
    /// A view handle was dropped. `suspended` is its state at drop time
    /// so the actor's counters stay balanced.
    ViewClosed { suspended: bool },
    /// A lagged view asked for a full rebuild.
    Resync,
}

/// One view's live handle on an order.
///
/// Dropping the handle closes it; when the last handle for an order is
/// gone the shared actor is cancelled, which stops its push listener and
/// poll timer.
pub struct OrderSubscription {
    order_id: OrderId,
    seed: SubscriptionSeed,
    updates: broadcast::Receiver<SyncUpdate>,
    commands: mpsc::Sender<ActorCommand>,
    registry: SharedRegistry,
    /// Highest message id this view has rendered (seed or update).
    delivered: Option<MessageId>,
    suspended: bool,
}

impl OrderSubscription {
    pub(crate) fn new(
        order_id: OrderId,
        seed: SubscriptionSeed,
        updates: broadcast::Receiver<SyncUpdate>,
        commands: mpsc::Sender<ActorCommand>,
        registry: SharedRegistry,
    ) -> Self {
        let delivered = seed.messages.last().map(|m| m.id);
        Self {
            order_id,
            seed,
            updates,
            commands,
            registry,
            delivered,
            suspended: false,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn seed(&self) -> &SubscriptionSeed {
        &self.seed
    }

    /// Next update for this view, or `None` once the subscription is
    /// closed.
    ///
    /// Messages already covered by the seed (or redelivered after a
    /// resync) are filtered here, so a consumer never renders the same
    /// id twice even when the shared broadcast overlaps its seed fetch.
    pub async fn recv(&mut self) -> Option<SyncUpdate> {
        loop {
            match self.updates.recv().await {
                Ok(SyncUpdate::Message(message)) => {
                    if self.delivered.is_some_and(|last| message.id <= last) {
                        continue;
                    }
                    self.delivered = Some(message.id);
                    return Some(SyncUpdate::Message(message));
                }
                Ok(SyncUpdate::Resynced { messages, order }) => {
                    self.delivered = messages.last().map(|m| m.id);
                    return Some(SyncUpdate::Resynced { messages, order });
                }
                Ok(other) => return Some(other),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(
                        order_id = %self.order_id,
                        skipped, "subscription lagged, requesting resync"
                    );
                    if self.commands.send(ActorCommand::Resync).await.is_err() {
                        return None;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Pause this view's share of polling (view went off-screen). The
    /// shared actor stops its poll timer once every attached view is
    /// suspended; push delivery continues regardless.
    pub async fn suspend(&mut self) {
        if !self.suspended {
            self.suspended = true;
            let _ = self.commands.send(ActorCommand::ViewSuspended).await;
        }
    }

    pub async fn resume(&mut self) {
        if self.suspended {
            self.suspended = false;
            let _ = self.commands.send(ActorCommand::ViewResumed).await;
        }
    }

    /// Close the subscription. Equivalent to dropping the handle.
    pub fn close(self) {}
}

impl Drop for OrderSubscription {
    fn drop(&mut self) {
        let _ = self.commands.try_send(ActorCommand::ViewClosed {
            suspended: self.suspended,
        });
        crate::engine::release(&self.registry, self.order_id);
    }
}
