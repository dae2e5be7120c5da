// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the Printdesk core.
//!
//! Validation-class errors (`OrderTerminal`, `IllegalTransition`,
//! `ForbiddenRole`, `EmptyMessage`) are recovered locally and surfaced to
//! the user as typed rejections. Storage and transport errors propagate to
//! the sync engine, which degrades to polling-only rather than failing the
//! subscription outright.

use thiserror::Error;

use crate::types::{OrderId, OrderStatus, Role};

/// The primary error type used across all Printdesk crates.
#[derive(Debug, Error)]
pub enum PrintdeskError {
    /// Write attempted against a completed or soft-deleted order.
    /// Surfaced as a disabled-input state, not a crash.
    #[error("order {order_id} is terminal (status: {status}, deleted: {deleted})")]
    OrderTerminal {
        order_id: OrderId,
        status: OrderStatus,
        deleted: bool,
    },

    /// Requested lifecycle move is not a legal one-step transition.
    #[error("illegal order transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The acting role is not allowed to perform this operation.
    #[error("role {role} may not {action}")]
    ForbiddenRole { role: Role, action: String },

    /// Message has neither content nor attachments.
    #[error("message must have content or at least one attachment")]
    EmptyMessage,

    /// Gap-fill after a missed push event itself failed; the subscription
    /// must resubscribe from scratch rather than keep partial state.
    #[error("unrecoverable sync gap for order {order_id}: {source}")]
    SyncGapUnrecoverable {
        order_id: OrderId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Push channel down. Non-fatal: polling continues, only push latency
    /// is lost.
    #[error("push transport unavailable: {message}")]
    TransportUnavailable { message: String },

    /// Entity lookup failed.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PrintdeskError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        PrintdeskError::Storage {
            source: Box::new(source),
        }
    }

    /// Build an [`PrintdeskError::OrderTerminal`] from an order snapshot.
    pub fn order_terminal(order: &crate::types::Order) -> Self {
        PrintdeskError::OrderTerminal {
            order_id: order.id,
            status: order.status,
            deleted: order.is_deleted(),
        }
    }

    /// Validation-class errors are surfaced as UI-level rejections and do
    /// not affect subscription health.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PrintdeskError::OrderTerminal { .. }
                | PrintdeskError::IllegalTransition { .. }
                | PrintdeskError::ForbiddenRole { .. }
                | PrintdeskError::EmptyMessage
                | PrintdeskError::NotFound { .. }
        )
    }
}
