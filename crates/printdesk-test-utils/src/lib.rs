// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Printdesk integration tests.
//!
//! Provides mock adapters and harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - full stack on a temp SQLite database
//! - [`MockBus`] - event bus with subscribe-failure and publish-drop injection
//! - [`StaticAuth`] / [`StaticFiles`] - fixed-identity and fixed-URL adapters

pub mod harness;
pub mod mock_bus;
pub mod statics;

pub use harness::TestHarness;
pub use mock_bus::MockBus;
pub use statics::{StaticAuth, StaticFiles};

/// Install a compact tracing subscriber for a test. Safe to call from
/// every test; only the first call wins.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "printdesk=debug".into()),
        )
        .with_test_writer()
        .compact()
        .try_init();
}
