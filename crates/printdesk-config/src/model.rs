// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at load time. Every field has a serde default so partial
//! files and env-only overrides both work.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Printdesk configuration.
///
/// Loaded from `printdesk.toml` with `PRINTDESK_*` environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrintdeskConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync engine tuning.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Event bus tuning.
    #[serde(default)]
    pub bus: BusConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "printdesk.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Sync engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Poll fallback interval in milliseconds. The poll timer is the
    /// correctness backstop when push never connects or silently stalls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Initial backoff for push reconnect attempts, in milliseconds.
    #[serde(default = "default_push_retry_base_ms")]
    pub push_retry_base_ms: u64,

    /// Backoff ceiling for push reconnect attempts, in milliseconds.
    #[serde(default = "default_push_retry_cap_ms")]
    pub push_retry_cap_ms: u64,

    /// Capacity of the per-order update broadcast to subscribed views.
    #[serde(default = "default_update_capacity")]
    pub update_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            push_retry_base_ms: default_push_retry_base_ms(),
            push_retry_cap_ms: default_push_retry_cap_ms(),
            update_capacity: default_update_capacity(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn push_retry_base(&self) -> Duration {
        Duration::from_millis(self.push_retry_base_ms)
    }

    pub fn push_retry_cap(&self) -> Duration {
        Duration::from_millis(self.push_retry_cap_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    4_000
}

fn default_push_retry_base_ms() -> u64 {
    500
}

fn default_push_retry_cap_ms() -> u64 {
    30_000
}

fn default_update_capacity() -> usize {
    256
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Per-subscriber channel capacity. A subscriber that falls this far
    /// behind starts losing events; the poll backstop covers the loss.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    512
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = PrintdeskConfig::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.storage.database_path, "printdesk.db");
        assert!(config.storage.wal_mode);
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(4));
        assert!(config.sync.push_retry_base() < config.sync.push_retry_cap());
        assert_eq!(config.bus.capacity, 512);
    }
}
