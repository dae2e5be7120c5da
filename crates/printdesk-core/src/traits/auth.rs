// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity context consumed from the authentication collaborator.
//!
//! Session issuance and token verification are external; this core only
//! needs to know who is acting and in which role.

use crate::types::{Role, UserId};

/// The authenticated identity behind the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub id: UserId,
    pub role: Role,
}

/// Provider of the current authenticated user.
pub trait AuthContext: Send + Sync + 'static {
    /// Identity and role used for permission checks.
    fn current_user(&self) -> UserContext;
}
