// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The assembled Printdesk service.
//!
//! [`PrintdeskBuilder`] wires the SQLite store, event bus, read ledger,
//! notification fan-out, and sync engine into one [`Printdesk`] handle.
//! Every operation authorizes the claimed actor against the injected
//! [`AuthContext`] before touching state; permission failures are typed
//! errors, never silent drops.

use std::collections::HashMap;
use std::sync::Arc;

use printdesk_bus::OrderBus;
use printdesk_config::PrintdeskConfig;
use printdesk_core::{
    lifecycle, Attachment, AuthContext, EventBus, FileStore, Message, MessageId, MessageStore,
    NewMessage, NewOrder, Notification, NotificationId, Order, OrderEvent, OrderId, OrderStatus,
    OrderStore, PrintdeskError, Role, UserContext, UserId,
};
use printdesk_ledger::ReadLedger;
use printdesk_notify::NotificationFanout;
use printdesk_storage::SqliteStore;
use printdesk_sync::{OrderSubscription, SyncEngine};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// File store used when the embedding application does not supply one.
/// Attachment references pass through unresolved.
struct PassthroughFiles;

#[async_trait::async_trait]
impl FileStore for PassthroughFiles {
    async fn resolve(&self, attachment: &Attachment) -> Result<String, PrintdeskError> {
        Ok(attachment.reference.clone())
    }
}

/// Builder for [`Printdesk`].
pub struct PrintdeskBuilder {
    config: PrintdeskConfig,
    auth: Option<Arc<dyn AuthContext>>,
    bus: Option<Arc<dyn EventBus>>,
    files: Option<Arc<dyn FileStore>>,
}

impl PrintdeskBuilder {
    fn new() -> Self {
        Self {
            config: PrintdeskConfig::default(),
            auth: None,
            bus: None,
            files: None,
        }
    }

    pub fn with_config(mut self, config: PrintdeskConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity provider. Required; there is no anonymous access.
    pub fn with_auth(mut self, auth: Arc<dyn AuthContext>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Override the push channel. Defaults to the in-process
    /// [`OrderBus`].
    pub fn with_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    /// Open the database, run migrations, and start the background
    /// fan-out loop.
    pub async fn build(self) -> Result<Printdesk, PrintdeskError> {
        let auth = self
            .auth
            .ok_or_else(|| PrintdeskError::Config("an AuthContext is required".into()))?;

        let store = Arc::new(SqliteStore::new(self.config.storage.clone()));
        store.initialize().await?;

        let bus: Arc<dyn EventBus> = match self.bus {
            Some(bus) => bus,
            None => Arc::new(OrderBus::new(self.config.bus.capacity)),
        };
        let files: Arc<dyn FileStore> = match self.files {
            Some(files) => files,
            None => Arc::new(PassthroughFiles),
        };

        let messages: Arc<dyn MessageStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store.clone();
        let ledger = Arc::new(ReadLedger::new(store.clone(), messages.clone()));
        let fanout = Arc::new(NotificationFanout::new(store.clone(), orders.clone()));
        let engine = Arc::new(SyncEngine::new(
            orders,
            messages,
            bus.clone(),
            ledger.clone(),
            self.config.sync.clone(),
        ));

        let shutdown = CancellationToken::new();
        match bus.subscribe_all().await {
            Ok(firehose) => {
                let fanout = fanout.clone();
                let token = shutdown.clone();
                tokio::spawn(async move { fanout.run(firehose, token).await });
            }
            Err(err) => {
                // Messaging and sync keep working; only notification
                // rows stop being produced.
                warn!(error = %err, "firehose unavailable, notification fan-out disabled");
            }
        }

        info!(
            database = %self.config.storage.database_path,
            "printdesk service started"
        );
        Ok(Printdesk {
            store,
            bus,
            auth,
            files,
            ledger,
            fanout,
            engine,
            shutdown,
        })
    }
}

/// The consumer surface: order lifecycle, messaging, read state, live
/// subscriptions, and notifications, all behind permission checks.
pub struct Printdesk {
    store: Arc<SqliteStore>,
    bus: Arc<dyn EventBus>,
    auth: Arc<dyn AuthContext>,
    files: Arc<dyn FileStore>,
    ledger: Arc<ReadLedger>,
    fanout: Arc<NotificationFanout>,
    engine: Arc<SyncEngine>,
    shutdown: CancellationToken,
}

impl Printdesk {
    pub fn builder() -> PrintdeskBuilder {
        PrintdeskBuilder::new()
    }

    /// Stop background tasks and close the database.
    pub async fn shutdown(self) -> Result<(), PrintdeskError> {
        self.shutdown.cancel();
        self.engine.shutdown();
        self.store.close().await
    }

    // ---- Orders ----

    /// Create an order. The authenticated user must be one of its two
    /// participants.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, PrintdeskError> {
        let user = self.auth.current_user();
        if user.id != order.customer_id && user.id != order.shop_owner_id {
            return Err(PrintdeskError::ForbiddenRole {
                role: user.role,
                action: "create an order for other users".into(),
            });
        }
        self.store.create(order).await
    }

    /// Fetch an order the authenticated user participates in.
    pub async fn order(&self, order_id: OrderId) -> Result<Order, PrintdeskError> {
        let user = self.auth.current_user();
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        Ok(order)
    }

    /// Orders for the authenticated user, newest first.
    pub async fn list_orders(&self, include_deleted: bool) -> Result<Vec<Order>, PrintdeskError> {
        let user = self.auth.current_user();
        self.store.list_for_user(user.id, include_deleted).await
    }

    /// Move an order one lifecycle step. Shop-owner only; the claimed
    /// role must match the authenticated one.
    pub async fn transition_order(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
        actor_role: Role,
    ) -> Result<Order, PrintdeskError> {
        let user = self.auth.current_user();
        if user.role != actor_role {
            return Err(PrintdeskError::ForbiddenRole {
                role: user.role,
                action: format!("transition as {actor_role}"),
            });
        }
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        let from = order.status;
        let updated = lifecycle::transition(&order, requested, actor_role)?;
        self.store.update(&updated).await?;
        self.publish_best_effort(OrderEvent::status_changed(order_id, from, requested, actor_role))
            .await;
        info!(order_id = %order_id, from = %from, to = %requested, "order transitioned");
        Ok(updated)
    }

    /// Soft-delete an order. Message history is retained.
    pub async fn delete_order(&self, order_id: OrderId) -> Result<Order, PrintdeskError> {
        let user = self.auth.current_user();
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        let deleted = lifecycle::soft_delete(&order, user.role)?;
        self.store.update(&deleted).await?;
        // Same-status event: subscribers refresh their snapshot.
        self.publish_best_effort(OrderEvent::status_changed(
            order_id,
            deleted.status,
            deleted.status,
            user.role,
        ))
        .await;
        Ok(deleted)
    }

    /// Toggle the urgent flag. Shop-owner only, non-terminal orders.
    pub async fn set_urgent(
        &self,
        order_id: OrderId,
        urgent: bool,
    ) -> Result<Order, PrintdeskError> {
        let user = self.auth.current_user();
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        let updated = lifecycle::set_urgent(&order, urgent, user.role)?;
        self.store.update(&updated).await?;
        self.publish_best_effort(OrderEvent::status_changed(
            order_id,
            updated.status,
            updated.status,
            user.role,
        ))
        .await;
        Ok(updated)
    }

    // ---- Messaging ----

    /// Validate and append a message, then publish its push event.
    ///
    /// The push publish is best-effort: the message is already durable
    /// and the poll backstop delivers it if the bus is down. A failed
    /// append is always a typed error back to the caller.
    pub async fn send_message(&self, message: NewMessage) -> Result<Message, PrintdeskError> {
        let user = self.authorize(message.sender_id)?;
        message.validate()?;
        let order = self.store.get(message.order_id).await?;
        self.ensure_participant(&order, user)?;
        if message.sender_role != user.role {
            return Err(PrintdeskError::ForbiddenRole {
                role: user.role,
                action: format!("send as {}", message.sender_role),
            });
        }
        lifecycle::ensure_writable(&order)?;
        let stored = self.store.append(message).await?;
        self.publish_best_effort(OrderEvent::message_created(stored.clone()))
            .await;
        Ok(stored)
    }

    /// Messages after `cursor` for an order the user participates in.
    pub async fn messages_since(
        &self,
        order_id: OrderId,
        cursor: Option<MessageId>,
    ) -> Result<Vec<Message>, PrintdeskError> {
        let user = self.auth.current_user();
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        self.store.list_since(order_id, cursor).await
    }

    // ---- Read state ----

    /// Advance the user's cursor to the order's newest message.
    pub async fn mark_order_read(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<(), PrintdeskError> {
        let user = self.authorize(user_id)?;
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        self.ledger.mark_order_read(order_id, user_id).await?;
        Ok(())
    }

    /// Advance the user's cursor to a specific message id (monotonic).
    pub async fn mark_read(
        &self,
        order_id: OrderId,
        user_id: UserId,
        upto: MessageId,
    ) -> Result<(), PrintdeskError> {
        let user = self.authorize(user_id)?;
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        self.ledger.mark_read(order_id, user_id, upto).await?;
        Ok(())
    }

    pub async fn unread_count(&self, order_id: OrderId) -> Result<u64, PrintdeskError> {
        let user = self.auth.current_user();
        self.ledger.unread_count(order_id, user.id).await
    }

    /// Unread counts across every non-deleted order the user
    /// participates in, one grouped query.
    pub async fn unread_counts(&self) -> Result<HashMap<OrderId, u64>, PrintdeskError> {
        let user = self.auth.current_user();
        let orders = self.store.list_for_user(user.id, false).await?;
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        self.ledger.unread_counts(user.id, &ids).await
    }

    // ---- Live subscriptions ----

    /// Open a live view on an order: seed snapshot plus an update
    /// stream. Dropping the returned handle closes the subscription.
    pub async fn subscribe_to_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<OrderSubscription, PrintdeskError> {
        let user = self.authorize(user_id)?;
        let order = self.store.get(order_id).await?;
        self.ensure_participant(&order, user)?;
        self.engine.subscribe(order_id, user_id).await
    }

    // ---- Notifications ----

    pub async fn list_notifications(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Notification>, PrintdeskError> {
        self.authorize(user_id)?;
        self.fanout.list(user_id).await
    }

    pub async fn notification_unread_count(&self, user_id: UserId) -> Result<u64, PrintdeskError> {
        self.authorize(user_id)?;
        self.fanout.unread_count(user_id).await
    }

    /// Mark one of the user's notifications read. A notification owned
    /// by someone else reads as `NotFound`.
    pub async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), PrintdeskError> {
        self.authorize(user_id)?;
        self.fanout.mark_read(user_id, id).await
    }

    pub async fn delete_notification(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), PrintdeskError> {
        self.authorize(user_id)?;
        self.fanout.delete(user_id, id).await
    }

    // ---- Files ----

    /// Resolve an attachment reference to a downloadable URL.
    pub async fn resolve_attachment(
        &self,
        attachment: &Attachment,
    ) -> Result<String, PrintdeskError> {
        self.files.resolve(attachment).await
    }

    // ---- Internal ----

    /// The authenticated user, verified to match the claimed id.
    fn authorize(&self, claimed: UserId) -> Result<UserContext, PrintdeskError> {
        let user = self.auth.current_user();
        if user.id != claimed {
            return Err(PrintdeskError::ForbiddenRole {
                role: user.role,
                action: format!("act as user {claimed}"),
            });
        }
        Ok(user)
    }

    /// Membership check: the user must be the order's customer or shop
    /// owner, in the role the order assigns them.
    fn ensure_participant(
        &self,
        order: &Order,
        user: UserContext,
    ) -> Result<(), PrintdeskError> {
        match order.role_of(user.id) {
            Some(role) if role == user.role => Ok(()),
            _ => Err(PrintdeskError::ForbiddenRole {
                role: user.role,
                action: format!("access order {}", order.id),
            }),
        }
    }

    async fn publish_best_effort(&self, event: OrderEvent) {
        if let Err(err) = self.bus.publish(event).await {
            warn!(error = %err, "event publish failed, poll backstop will recover");
        }
    }
}
