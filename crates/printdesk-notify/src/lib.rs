// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification fan-out.
//!
//! Converts order events from the bus firehose into user-addressed
//! notification rows: `new_message` for the counterpart participant
//! (coalesced while unread, so a message burst produces one bell entry
//! with a count), `status_change` for the non-actor participant.
//!
//! Notification read state is independent of the chat read ledger by
//! design: the bell and the chat badge answer different questions.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use printdesk_core::traits::bus::EventStream;
use printdesk_core::{
    Notification, NotificationId, NotificationKind, NotificationStore, OrderEvent,
    OrderEventKind, OrderStore, PrintdeskError, Role, UserId,
};

/// Turns order events into notification rows.
pub struct NotificationFanout {
    notifications: Arc<dyn NotificationStore>,
    orders: Arc<dyn OrderStore>,
}

impl NotificationFanout {
    pub fn new(notifications: Arc<dyn NotificationStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            notifications,
            orders,
        }
    }

    /// Consume the bus firehose until cancelled or the stream ends.
    ///
    /// Event handling failures are logged and skipped; one bad event must
    /// not stall the feed.
    pub async fn run(&self, mut firehose: EventStream, shutdown: CancellationToken) {
        info!("notification fan-out started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("notification fan-out cancelled");
                    break;
                }
                event = firehose.next() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(&event).await {
                                warn!(order_id = %event.order_id, error = %e, "notification fan-out event failed");
                            }
                        }
                        None => {
                            warn!("bus firehose ended, notification fan-out stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Handle one event. Public so tests and embedders can drive the
    /// fan-out deterministically without the background task.
    pub async fn handle_event(&self, event: &OrderEvent) -> Result<(), PrintdeskError> {
        match &event.kind {
            OrderEventKind::MessageCreated { message } => {
                let order = self.orders.get(event.order_id).await?;
                // The sender never notifies themselves; a sender outside
                // the order's participants notifies nobody.
                let Some(target) = order.counterpart_of(message.sender_id) else {
                    warn!(order_id = %order.id, sender_id = %message.sender_id,
                          "message from non-participant, no notification");
                    return Ok(());
                };
                let row = self
                    .notifications
                    .coalesce_message(target, order.id)
                    .await?;
                debug!(order_id = %order.id, user_id = %target,
                       count = row.coalesced_count, "message notification recorded");
            }
            OrderEventKind::StatusChanged {
                from,
                to,
                actor_role,
            } => {
                // Same-status events are snapshot refreshes (urgency
                // toggle, soft delete), not lifecycle moves.
                if from == to {
                    return Ok(());
                }
                let order = self.orders.get(event.order_id).await?;
                let target = match actor_role {
                    Role::ShopOwner => order.customer_id,
                    Role::Customer => order.shop_owner_id,
                };
                self.notifications
                    .insert(target, NotificationKind::StatusChange, order.id)
                    .await?;
                debug!(order_id = %order.id, user_id = %target, %from, %to,
                       "status notification recorded");
            }
        }
        Ok(())
    }

    /// All notifications for the user, newest activity first.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Notification>, PrintdeskError> {
        self.notifications.list_for_user(user_id).await
    }

    /// Unread rows for the user's bell badge.
    pub async fn unread_count(&self, user_id: UserId) -> Result<u64, PrintdeskError> {
        self.notifications.unread_count(user_id).await
    }

    /// Mark one of the user's notifications read. Independent of the
    /// chat cursor.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), PrintdeskError> {
        self.notifications.mark_read(user_id, id).await
    }

    /// Delete one of the user's notification rows.
    pub async fn delete(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), PrintdeskError> {
        self.notifications.delete(user_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use printdesk_bus::OrderBus;
    use printdesk_config::StorageConfig;
    use printdesk_core::{
        EventBus, Message, MessageId, NewOrder, Order, OrderStatus, OrderType,
    };
    use printdesk_storage::SqliteStore;
    use tempfile::tempdir;

    async fn fanout_with_order() -> (NotificationFanout, Arc<SqliteStore>, Order, tempfile::TempDir)
    {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: dir.path().join("notify.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        store.initialize().await.unwrap();
        let order = printdesk_core::OrderStore::create(
            store.as_ref(),
            NewOrder {
                order_type: OrderType::Upload,
                customer_id: UserId(10),
                shop_owner_id: UserId(20),
                is_urgent: false,
            },
        )
        .await
        .unwrap();
        let fanout = NotificationFanout::new(store.clone(), store.clone());
        (fanout, store, order, dir)
    }

    fn message_event(order: &Order, sender: UserId, role: Role, seq: i64) -> OrderEvent {
        OrderEvent::message_created(Message {
            id: MessageId(seq),
            order_id: order.id,
            sender_id: sender,
            sender_role: role,
            content: "hi".into(),
            attachments: vec![],
            created_at: Utc::now(),
            read_by: vec![],
        })
    }

    #[tokio::test]
    async fn message_burst_coalesces_into_one_bell_entry() {
        let (fanout, _store, order, _dir) = fanout_with_order().await;

        for seq in 1..=5 {
            fanout
                .handle_event(&message_event(&order, UserId(10), Role::Customer, seq))
                .await
                .unwrap();
        }

        let bell = fanout.list(UserId(20)).await.unwrap();
        assert_eq!(bell.len(), 1);
        assert_eq!(bell[0].kind, NotificationKind::NewMessage);
        assert_eq!(bell[0].coalesced_count, 5);
        // The sender's own bell stays empty.
        assert!(fanout.list(UserId(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_change_notifies_the_non_actor() {
        let (fanout, _store, order, _dir) = fanout_with_order().await;

        fanout
            .handle_event(&OrderEvent::status_changed(
                order.id,
                OrderStatus::New,
                OrderStatus::Processing,
                Role::ShopOwner,
            ))
            .await
            .unwrap();

        let customer_bell = fanout.list(UserId(10)).await.unwrap();
        assert_eq!(customer_bell.len(), 1);
        assert_eq!(customer_bell[0].kind, NotificationKind::StatusChange);
        assert!(fanout.list(UserId(20)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_read_state_is_independent_of_chat_state() {
        let (fanout, _store, order, _dir) = fanout_with_order().await;

        fanout
            .handle_event(&message_event(&order, UserId(10), Role::Customer, 1))
            .await
            .unwrap();
        let bell = fanout.list(UserId(20)).await.unwrap();
        fanout.mark_read(UserId(20), bell[0].id).await.unwrap();
        assert_eq!(fanout.unread_count(UserId(20)).await.unwrap(), 0);

        // Marking the bell read did not touch the chat cursor: the chat
        // unread count still sees the message.
        let chat_unread = printdesk_core::MessageStore::unread_count(
            _store.as_ref(),
            order.id,
            UserId(20),
        )
        .await
        .unwrap();
        // No message rows were inserted by the fan-out test helper, so the
        // chat count is zero here; the invariant under test is that
        // mark_read never created or advanced a cursor.
        assert_eq!(chat_unread, 0);
        assert!(
            printdesk_core::ReadCursorStore::get(_store.as_ref(), order.id, UserId(20))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn non_participant_sender_notifies_nobody() {
        let (fanout, _store, order, _dir) = fanout_with_order().await;
        fanout
            .handle_event(&message_event(&order, UserId(99), Role::Customer, 1))
            .await
            .unwrap();
        assert!(fanout.list(UserId(10)).await.unwrap().is_empty());
        assert!(fanout.list(UserId(20)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_refresh_events_produce_no_notification() {
        let (fanout, _store, order, _dir) = fanout_with_order().await;

        // from == to marks a refresh (soft delete, urgency toggle).
        fanout
            .handle_event(&OrderEvent::status_changed(
                order.id,
                OrderStatus::New,
                OrderStatus::New,
                Role::Customer,
            ))
            .await
            .unwrap();

        assert!(fanout.list(UserId(10)).await.unwrap().is_empty());
        assert!(fanout.list(UserId(20)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_consumes_the_firehose_until_cancelled() {
        let (fanout, _store, order, _dir) = fanout_with_order().await;
        let bus = Arc::new(OrderBus::new(16));
        let firehose = bus.subscribe_all().await.unwrap();
        let shutdown = CancellationToken::new();

        let fanout = Arc::new(fanout);
        let task = {
            let fanout = fanout.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { fanout.run(firehose, shutdown).await })
        };

        bus.publish(message_event(&order, UserId(10), Role::Customer, 1))
            .await
            .unwrap();

        // Wait for the row to land, then cancel.
        for _ in 0..50 {
            if !fanout.list(UserId(20)).await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(fanout.list(UserId(20)).await.unwrap().len(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }
}
