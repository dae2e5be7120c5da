// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use printdesk_config::StorageConfig;
use printdesk_core::PrintdeskError;
use tracing::debug;

/// Handle to the single SQLite connection.
///
/// Migrations run on a short-lived blocking connection before the async
/// connection opens, so the schema is in place by the time any query
/// module can reach the database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at the configured path,
    /// apply PRAGMAs, and run pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Database, PrintdeskError> {
        let path = config.database_path.clone();
        let wal = config.wal_mode;

        let migrate_path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), PrintdeskError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(PrintdeskError::storage)?;
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(PrintdeskError::storage)?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(PrintdeskError::storage)?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| PrintdeskError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(PrintdeskError::storage)?;
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path, wal, "database opened");
        Ok(Database { conn })
    }

    /// The underlying tokio-rusqlite connection. All query modules go
    /// through this handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and flush pending writes.
    pub async fn close(&self) -> Result<(), PrintdeskError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace storage error.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error) -> PrintdeskError {
    PrintdeskError::Storage {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_close_checkpoints() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();

        // Schema exists: all four tables are queryable.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('orders', 'messages', 'read_cursors', 'notifications')",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<i64, rusqlite::Error>(count)
            })
            .await
            .unwrap();
        assert_eq!(count, 4);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Migrations are tracked; opening again must not fail.
        let db = Database::open(&config).await.unwrap();
        db.close().await.unwrap();
    }
}
