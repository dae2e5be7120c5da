// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Printdesk.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed CRUD
//! operations for orders, messages, read cursors, and notifications.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;
