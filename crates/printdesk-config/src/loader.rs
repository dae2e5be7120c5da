// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports `./printdesk.toml` > `~/.config/printdesk/printdesk.toml`
//! with environment variable overrides via the `PRINTDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PrintdeskConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `~/.config/printdesk/printdesk.toml` (user XDG config)
/// 3. `./printdesk.toml` (local directory)
/// 4. `PRINTDESK_*` environment variables
pub fn load_config() -> Result<PrintdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PrintdeskConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("printdesk/printdesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("printdesk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PrintdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PrintdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PrintdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PrintdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `PRINTDESK_SYNC_POLL_INTERVAL_MS` must map
/// to `sync.poll_interval_ms`, not `sync.poll.interval.ms`.
fn env_provider() -> Env {
    Env::prefixed("PRINTDESK_").map(|key| {
        // `key` keeps the env var's original casing with the prefix
        // stripped, e.g. SYNC_POLL_INTERVAL_MS. Lowercase before the
        // section mapping so the prefixes actually match.
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("log_", "log.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("sync_", "sync.", 1)
            .replacen("bus_", "bus.", 1);
        mapped.into()
    })
}
