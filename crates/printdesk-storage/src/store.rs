// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use printdesk_config::StorageConfig;
use printdesk_core::{
    Message, MessageId, NewMessage, NewOrder, Notification, NotificationId, NotificationKind,
    Order, OrderId, PrintdeskError, ReadCursor, UserId,
};
use printdesk_core::{MessageStore, NotificationStore, OrderStore, ReadCursorStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed implementation of all four store traits.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`SqliteStore::initialize`], and one instance serves every component:
/// the single-writer connection underneath is what keeps per-order
/// sequence assignment atomic.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store with the given configuration. The database is not
    /// opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), PrintdeskError> {
        let db = Database::open(&self.config).await?;
        self.db.set(db).map_err(|_| {
            PrintdeskError::Internal("storage already initialized".to_string())
        })?;
        debug!(path = %self.config.database_path, "sqlite store initialized");
        Ok(())
    }

    /// Checkpoint and flush before shutdown.
    pub async fn close(&self) -> Result<(), PrintdeskError> {
        self.db()?.close().await
    }

    fn db(&self) -> Result<&Database, PrintdeskError> {
        self.db.get().ok_or_else(|| {
            PrintdeskError::Internal(
                "storage not initialized -- call initialize() first".to_string(),
            )
        })
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, message: NewMessage) -> Result<Message, PrintdeskError> {
        queries::messages::append(self.db()?, message).await
    }

    async fn list_since(
        &self,
        order_id: OrderId,
        cursor: Option<MessageId>,
    ) -> Result<Vec<Message>, PrintdeskError> {
        queries::messages::list_since(self.db()?, order_id, cursor).await
    }

    async fn latest_id(&self, order_id: OrderId) -> Result<Option<MessageId>, PrintdeskError> {
        queries::messages::latest_id(self.db()?, order_id).await
    }

    async fn unread_count(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<u64, PrintdeskError> {
        queries::messages::unread_count(self.db()?, order_id, user_id).await
    }

    async fn unread_counts(
        &self,
        user_id: UserId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, u64>, PrintdeskError> {
        queries::messages::unread_counts(self.db()?, user_id, order_ids).await
    }
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn create(&self, order: NewOrder) -> Result<Order, PrintdeskError> {
        queries::orders::create(self.db()?, order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Order, PrintdeskError> {
        queries::orders::get(self.db()?, order_id).await
    }

    async fn update(&self, order: &Order) -> Result<(), PrintdeskError> {
        queries::orders::update(self.db()?, order).await
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        include_deleted: bool,
    ) -> Result<Vec<Order>, PrintdeskError> {
        queries::orders::list_for_user(self.db()?, user_id, include_deleted).await
    }
}

#[async_trait]
impl ReadCursorStore for SqliteStore {
    async fn get(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<ReadCursor>, PrintdeskError> {
        queries::cursors::get(self.db()?, order_id, user_id).await
    }

    async fn advance(
        &self,
        order_id: OrderId,
        user_id: UserId,
        upto: MessageId,
    ) -> Result<ReadCursor, PrintdeskError> {
        queries::cursors::advance(self.db()?, order_id, user_id, upto).await
    }
}

#[async_trait]
impl NotificationStore for SqliteStore {
    async fn insert(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        order_id: OrderId,
    ) -> Result<Notification, PrintdeskError> {
        queries::notifications::insert(self.db()?, user_id, kind, order_id).await
    }

    async fn coalesce_message(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Notification, PrintdeskError> {
        queries::notifications::coalesce_message(self.db()?, user_id, order_id).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, PrintdeskError> {
        queries::notifications::list_for_user(self.db()?, user_id).await
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64, PrintdeskError> {
        queries::notifications::unread_count(self.db()?, user_id).await
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<(), PrintdeskError> {
        queries::notifications::mark_read(self.db()?, user_id, id).await
    }

    async fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), PrintdeskError> {
        queries::notifications::delete(self.db()?, user_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printdesk_core::{OrderType, Role};
    use tempfile::tempdir;

    fn make_config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("store.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_store_returns_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(&dir));
        let err = OrderStore::get(&store, OrderId(1)).await.unwrap_err();
        assert!(matches!(err, PrintdeskError::Internal(_)));
    }

    #[tokio::test]
    async fn double_initialize_is_an_error() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(&dir));
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn traits_delegate_to_one_database() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(&dir));
        store.initialize().await.unwrap();

        let order = OrderStore::create(
            &store,
            NewOrder {
                order_type: OrderType::Walkin,
                customer_id: UserId(1),
                shop_owner_id: UserId(2),
                is_urgent: true,
            },
        )
        .await
        .unwrap();

        let msg = MessageStore::append(
            &store,
            NewMessage {
                order_id: order.id,
                sender_id: UserId(1),
                sender_role: Role::Customer,
                content: "hello".into(),
                attachments: vec![],
            },
        )
        .await
        .unwrap();
        assert_eq!(msg.id, MessageId(1));

        ReadCursorStore::advance(&store, order.id, UserId(2), msg.id)
            .await
            .unwrap();
        assert_eq!(
            MessageStore::unread_count(&store, order.id, UserId(2))
                .await
                .unwrap(),
            0
        );

        store.close().await.unwrap();
    }
}
