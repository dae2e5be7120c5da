// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sync engine: one reference-counted actor per actively-viewed
//! order.
//!
//! Every view of an order attaches to the same actor, which merges the
//! push stream and the poll backstop through a [`Reconciler`] and fans
//! the result out on a broadcast channel. The last detaching view
//! cancels the actor, deterministically stopping both its push listener
//! and its poll timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use printdesk_config::SyncConfig;
use printdesk_core::{
    lifecycle, EventBus, EventStream, MessageStore, Order, OrderEvent, OrderEventKind, OrderId,
    OrderStore, PrintdeskError, UserId,
};
use printdesk_ledger::ReadLedger;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::backoff::Backoff;
use crate::reconcile::{Applied, Reconciler};
use crate::subscription::{ActorCommand, OrderSubscription, SubscriptionSeed, SyncUpdate};

const COMMAND_CAPACITY: usize = 64;

pub(crate) struct ActorEntry {
    refcount: usize,
    updates: broadcast::Sender<SyncUpdate>,
    commands: mpsc::Sender<ActorCommand>,
    cancel: CancellationToken,
}

pub(crate) type SharedRegistry = Arc<Mutex<HashMap<OrderId, ActorEntry>>>;

/// Drop one view's reference; the last reference cancels the actor.
pub(crate) fn release(registry: &SharedRegistry, order_id: OrderId) {
    let mut map = registry.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(entry) = map.get_mut(&order_id) {
        entry.refcount -= 1;
        if entry.refcount == 0 {
            entry.cancel.cancel();
            map.remove(&order_id);
        }
    }
}

/// Shared synchronization service. Cheap to clone via `Arc`; the facade
/// holds one instance for the process.
pub struct SyncEngine {
    orders: Arc<dyn OrderStore>,
    messages: Arc<dyn MessageStore>,
    bus: Arc<dyn EventBus>,
    ledger: Arc<ReadLedger>,
    config: SyncConfig,
    registry: SharedRegistry,
}

impl SyncEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        messages: Arc<dyn MessageStore>,
        bus: Arc<dyn EventBus>,
        ledger: Arc<ReadLedger>,
        config: SyncConfig,
    ) -> Self {
        Self {
            orders,
            messages,
            bus,
            ledger,
            config,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open a view on an order for `user_id`.
    ///
    /// Attaches to the order's existing actor when one is live, spawning
    /// one otherwise, then captures the seed (order snapshot, full
    /// message history, unread count). The broadcast receiver is created
    /// before the seed is read, so a message appended during the seed
    /// fetch is never lost: it lands in the seed, in the stream, or in
    /// both, and the handle deduplicates the overlap.
    pub async fn subscribe(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<OrderSubscription, PrintdeskError> {
        let (updates, commands, attached_to_existing) = self.attach(order_id);
        if attached_to_existing {
            // Awaited so the actor's view count never drifts under
            // command-channel backpressure. Fails only when the actor is
            // already cancelled, in which case the count no longer matters.
            let _ = commands.send(ActorCommand::ViewOpened).await;
        }

        let seed = match self.load_seed(order_id, user_id).await {
            Ok(seed) => seed,
            Err(err) => {
                release(&self.registry, order_id);
                return Err(err);
            }
        };

        Ok(OrderSubscription::new(
            order_id,
            seed,
            updates,
            commands,
            Arc::clone(&self.registry),
        ))
    }

    /// Cancel every live actor. Called on service shutdown; outstanding
    /// handles drain their broadcast backlog and then see end-of-stream.
    pub fn shutdown(&self) {
        let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        for entry in map.values() {
            entry.cancel.cancel();
        }
        map.clear();
    }

    /// Number of live per-order actors.
    pub fn active_orders(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Join the order's live actor, spawning one when none exists. The
    /// boolean is true when an actor was already running, in which case
    /// the caller must send it `ViewOpened`.
    fn attach(
        &self,
        order_id: OrderId,
    ) -> (
        broadcast::Receiver<SyncUpdate>,
        mpsc::Sender<ActorCommand>,
        bool,
    ) {
        let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = map.get_mut(&order_id) {
            entry.refcount += 1;
            return (entry.updates.subscribe(), entry.commands.clone(), true);
        }

        let (updates, rx) = broadcast::channel(self.config.update_capacity);
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let cancel = CancellationToken::new();

        let actor = SyncActor {
            order_id,
            orders: Arc::clone(&self.orders),
            messages: Arc::clone(&self.messages),
            bus: Arc::clone(&self.bus),
            config: self.config.clone(),
            updates: updates.clone(),
            commands: command_rx,
            cancel: cancel.clone(),
            reconciler: Reconciler::new(None),
            order: None,
            total_views: 1,
            suspended_views: 0,
        };
        tokio::spawn(actor.run());

        map.insert(
            order_id,
            ActorEntry {
                refcount: 1,
                updates,
                commands: commands.clone(),
                cancel,
            },
        );
        (rx, commands, false)
    }

    async fn load_seed(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<SubscriptionSeed, PrintdeskError> {
        let order = self.orders.get(order_id).await?;
        let messages = self.messages.list_since(order_id, None).await?;
        let unread_count = self.ledger.unread_count(order_id, user_id).await?;
        Ok(SubscriptionSeed {
            order,
            messages,
            unread_count,
        })
    }
}

/// The per-order merge loop. Owned by its spawned task; communicates
/// only through the broadcast sender and command receiver.
struct SyncActor {
    order_id: OrderId,
    orders: Arc<dyn OrderStore>,
    messages: Arc<dyn MessageStore>,
    bus: Arc<dyn EventBus>,
    config: SyncConfig,
    updates: broadcast::Sender<SyncUpdate>,
    commands: mpsc::Receiver<ActorCommand>,
    cancel: CancellationToken,
    reconciler: Reconciler,
    /// Local order snapshot used to validate reported transitions.
    order: Option<Order>,
    total_views: usize,
    suspended_views: usize,
}

impl SyncActor {
    async fn run(mut self) {
        if !self.initialize().await {
            return;
        }

        let mut poll = tokio::time::interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut backoff = Backoff::new(self.config.push_retry_base(), self.config.push_retry_cap());
        let mut push: Option<EventStream> = None;
        // Connect immediately; until then the poll timer carries sync.
        let mut reconnect_at: Option<Instant> = Some(Instant::now());

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(command) = self.commands.recv() => {
                    self.handle_command(command).await;
                }
                _ = poll.tick(), if self.poll_enabled() => {
                    self.poll_once().await;
                }
                event = next_event(&mut push) => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        debug!(order_id = %self.order_id, "push stream ended");
                        push = None;
                        reconnect_at = Some(Instant::now() + backoff.next_delay());
                    }
                },
                _ = wait_until(reconnect_at), if push.is_none() => {
                    match self.bus.subscribe(self.order_id).await {
                        Ok(stream) => {
                            push = Some(stream);
                            reconnect_at = None;
                            backoff.reset();
                            // Anything pushed while degraded is caught up
                            // here rather than waiting for the next tick.
                            self.poll_once().await;
                        }
                        Err(err) => {
                            let delay = backoff.next_delay();
                            debug!(
                                order_id = %self.order_id,
                                error = %err,
                                retry_in_ms = delay.as_millis() as u64,
                                "push subscribe failed, staying poll-only"
                            );
                            reconnect_at = Some(Instant::now() + delay);
                        }
                    }
                }
            }
        }
        trace!(order_id = %self.order_id, "sync actor stopped");
    }

    /// Fetch the initial snapshot and watermark, retrying transient
    /// storage errors. Returns false when the actor should not start.
    async fn initialize(&mut self) -> bool {
        let mut backoff = Backoff::new(self.config.push_retry_base(), self.config.push_retry_cap());
        loop {
            let loaded = async {
                let order = self.orders.get(self.order_id).await?;
                let latest = self.messages.latest_id(self.order_id).await?;
                Ok::<_, PrintdeskError>((order, latest))
            }
            .await;
            match loaded {
                Ok((order, latest)) => {
                    self.order = Some(order);
                    self.reconciler.reset(latest);
                    return true;
                }
                Err(PrintdeskError::NotFound { .. }) => {
                    warn!(order_id = %self.order_id, "subscribed order does not exist");
                    return false;
                }
                Err(err) => {
                    warn!(order_id = %self.order_id, error = %err, "initial load failed");
                    let delay = backoff.next_delay();
                    tokio::select! {
                        _ = self.cancel.cancelled() => return false,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    fn poll_enabled(&self) -> bool {
        self.suspended_views < self.total_views
    }

    async fn handle_command(&mut self, command: ActorCommand) {
        match command {
            ActorCommand::ViewOpened => self.total_views += 1,
            ActorCommand::ViewSuspended => {
                self.suspended_views = (self.suspended_views + 1).min(self.total_views);
            }
            ActorCommand::ViewResumed => {
                let was_idle = !self.poll_enabled();
                self.suspended_views = self.suspended_views.saturating_sub(1);
                if was_idle && self.poll_enabled() {
                    // Catch up immediately instead of waiting a tick.
                    self.poll_once().await;
                }
            }
            ActorCommand::ViewClosed { suspended } => {
                self.total_views = self.total_views.saturating_sub(1);
                if suspended {
                    self.suspended_views = self.suspended_views.saturating_sub(1);
                }
            }
            ActorCommand::Resync => self.full_resync().await,
        }
    }

    async fn handle_event(&mut self, event: OrderEvent) {
        if event.order_id != self.order_id {
            warn!(
                order_id = %self.order_id,
                event_order_id = %event.order_id,
                "event for foreign order on topic, dropping"
            );
            return;
        }
        match event.kind {
            OrderEventKind::MessageCreated { message } => match self.reconciler.offer(message) {
                Applied::Fresh(message) => {
                    let _ = self.updates.send(SyncUpdate::Message(message));
                }
                Applied::Duplicate => {
                    trace!(order_id = %self.order_id, "duplicate push dropped");
                }
                Applied::Gap { expected, got } => {
                    debug!(
                        order_id = %self.order_id,
                        expected = %expected,
                        got = %got,
                        "push gap detected, filling from store"
                    );
                    self.gap_fill().await;
                }
            },
            OrderEventKind::StatusChanged {
                from,
                to,
                actor_role,
            } => {
                let Some(local) = self.order.clone() else {
                    self.full_resync().await;
                    return;
                };
                if from == to {
                    // Snapshot refresh (urgency toggle, soft delete).
                    self.refresh_order().await;
                } else if local.status == to {
                    trace!(order_id = %self.order_id, "duplicate status event dropped");
                } else if local.status == from
                    && lifecycle::transition(&local, to, actor_role).is_ok()
                {
                    self.refresh_order().await;
                } else {
                    warn!(
                        order_id = %self.order_id,
                        local = %local.status,
                        from = %from,
                        to = %to,
                        "unexpected status transition, resyncing"
                    );
                    self.full_resync().await;
                }
            }
        }
    }

    /// Refetch the authoritative snapshot and broadcast it if changed.
    async fn refresh_order(&mut self) {
        match self.orders.get(self.order_id).await {
            Ok(snapshot) => {
                if self.order.as_ref() != Some(&snapshot) {
                    self.order = Some(snapshot.clone());
                    let _ = self.updates.send(SyncUpdate::Status(snapshot));
                }
            }
            Err(err) => {
                warn!(order_id = %self.order_id, error = %err, "order refetch failed, resyncing");
                self.full_resync().await;
            }
        }
    }

    /// Fetch messages above the watermark and broadcast the fresh ones.
    async fn poll_once(&mut self) {
        let since = self.reconciler.watermark();
        match self.messages.list_since(self.order_id, since).await {
            Ok(batch) => {
                for message in self.reconciler.merge(batch) {
                    let _ = self.updates.send(SyncUpdate::Message(message));
                }
            }
            Err(err) => {
                // Retried on the next tick.
                debug!(order_id = %self.order_id, error = %err, "poll failed");
            }
        }
    }

    async fn gap_fill(&mut self) {
        let since = self.reconciler.watermark();
        match self.messages.list_since(self.order_id, since).await {
            Ok(batch) => {
                for message in self.reconciler.merge(batch) {
                    let _ = self.updates.send(SyncUpdate::Message(message));
                }
            }
            Err(err) => {
                let err = PrintdeskError::SyncGapUnrecoverable {
                    order_id: self.order_id,
                    source: Box::new(err),
                };
                warn!(order_id = %self.order_id, error = %err, "gap fill failed");
                self.full_resync().await;
            }
        }
    }

    /// Tear down the merged view and rebuild it from the store. Views
    /// see `Reconnecting` immediately and `Resynced` once the rebuild
    /// lands; redelivered messages are deduplicated per-view.
    async fn full_resync(&mut self) {
        let _ = self.updates.send(SyncUpdate::Reconnecting);
        let mut backoff = Backoff::new(self.config.push_retry_base(), self.config.push_retry_cap());
        loop {
            let loaded = async {
                let order = self.orders.get(self.order_id).await?;
                let messages = self.messages.list_since(self.order_id, None).await?;
                Ok::<_, PrintdeskError>((order, messages))
            }
            .await;
            match loaded {
                Ok((order, messages)) => {
                    self.reconciler.reset(messages.last().map(|m| m.id));
                    self.order = Some(order.clone());
                    let _ = self.updates.send(SyncUpdate::Resynced { messages, order });
                    return;
                }
                Err(PrintdeskError::NotFound { .. }) => {
                    warn!(order_id = %self.order_id, "order vanished during resync");
                    return;
                }
                Err(err) => {
                    warn!(order_id = %self.order_id, error = %err, "resync failed, retrying");
                    let delay = backoff.next_delay();
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

async fn next_event(push: &mut Option<EventStream>) -> Option<OrderEvent> {
    match push.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
