// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness assembling the full sync stack.
//!
//! `TestHarness` wires a temp SQLite store, a fault-injectable bus, the
//! read ledger, notification fan-out, and the sync engine -- the same
//! shape the facade assembles in production, minus the facade itself.

use std::sync::Arc;

use printdesk_config::{StorageConfig, SyncConfig};
use printdesk_core::{
    EventBus, Message, MessageStore, NewMessage, NewOrder, NotificationStore, Order, OrderEvent,
    OrderId, OrderStore, OrderType, PrintdeskError, ReadCursorStore, Role, UserId,
};
use printdesk_ledger::ReadLedger;
use printdesk_notify::NotificationFanout;
use printdesk_storage::SqliteStore;
use printdesk_sync::SyncEngine;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::mock_bus::MockBus;

/// Default fixture identities.
pub const CUSTOMER: UserId = UserId(10);
pub const SHOP_OWNER: UserId = UserId(20);

/// Builder for harness variants.
pub struct TestHarnessBuilder {
    sync: SyncConfig,
    run_fanout: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            sync: SyncConfig::default(),
            run_fanout: false,
        }
    }

    /// Override sync timings (tests usually shrink the poll interval).
    pub fn with_sync_config(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Spawn the notification fan-out loop on the bus firehose.
    pub fn with_fanout(mut self) -> Self {
        self.run_fanout = true;
        self
    }

    pub async fn build(self) -> Result<TestHarness, PrintdeskError> {
        let temp_dir = TempDir::new().map_err(PrintdeskError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        store.initialize().await?;

        let bus = Arc::new(MockBus::new(64));
        let messages: Arc<dyn MessageStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store.clone();
        let cursors: Arc<dyn ReadCursorStore> = store.clone();
        let notifications: Arc<dyn NotificationStore> = store.clone();

        let ledger = Arc::new(ReadLedger::new(cursors, messages.clone()));
        let fanout = Arc::new(NotificationFanout::new(notifications, orders.clone()));
        let engine = Arc::new(SyncEngine::new(
            orders,
            messages,
            bus.clone(),
            ledger.clone(),
            self.sync,
        ));

        let shutdown = CancellationToken::new();
        if self.run_fanout {
            let firehose = bus.subscribe_all().await?;
            let fanout = fanout.clone();
            let token = shutdown.clone();
            tokio::spawn(async move { fanout.run(firehose, token).await });
        }

        Ok(TestHarness {
            _temp_dir: temp_dir,
            store,
            bus,
            ledger,
            fanout,
            engine,
            shutdown,
        })
    }
}

/// A complete stack over a temp database.
pub struct TestHarness {
    _temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub bus: Arc<MockBus>,
    pub ledger: Arc<ReadLedger>,
    pub fanout: Arc<NotificationFanout>,
    pub engine: Arc<SyncEngine>,
    shutdown: CancellationToken,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn new() -> Result<Self, PrintdeskError> {
        Self::builder().build().await
    }

    /// Create an upload order between the fixture customer and shop
    /// owner.
    pub async fn seed_order(&self) -> Result<Order, PrintdeskError> {
        self.store
            .create(NewOrder {
                order_type: OrderType::Upload,
                customer_id: CUSTOMER,
                shop_owner_id: SHOP_OWNER,
                is_urgent: false,
            })
            .await
    }

    /// Append a message and publish its push event, the way the facade's
    /// `send_message` does.
    pub async fn send_message(
        &self,
        order_id: OrderId,
        sender_id: UserId,
        sender_role: Role,
        content: &str,
    ) -> Result<Message, PrintdeskError> {
        let message = self
            .store
            .append(NewMessage {
                order_id,
                sender_id,
                sender_role,
                content: content.to_string(),
                attachments: Vec::new(),
            })
            .await?;
        self.bus
            .publish(OrderEvent::message_created(message.clone()))
            .await?;
        Ok(message)
    }

    /// Append a message without publishing, simulating a write whose
    /// push event was lost before reaching the bus.
    pub async fn send_message_unpublished(
        &self,
        order_id: OrderId,
        sender_id: UserId,
        sender_role: Role,
        content: &str,
    ) -> Result<Message, PrintdeskError> {
        self.store
            .append(NewMessage {
                order_id,
                sender_id,
                sender_role,
                content: content.to_string(),
                attachments: Vec::new(),
            })
            .await
    }

    pub async fn shutdown(self) -> Result<(), PrintdeskError> {
        self.shutdown.cancel();
        self.engine.shutdown();
        self.store.close().await
    }
}
