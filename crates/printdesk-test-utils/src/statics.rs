// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-value adapters for the identity and file-storage seams.

use std::sync::Mutex;

use async_trait::async_trait;
use printdesk_core::{
    Attachment, AuthContext, FileStore, PrintdeskError, Role, UserContext, UserId,
};

/// Auth context reporting a settable user. Tests switch identities with
/// [`StaticAuth::login`] to act as each side of an order.
pub struct StaticAuth {
    user: Mutex<UserContext>,
}

impl StaticAuth {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            user: Mutex::new(UserContext { id, role }),
        }
    }

    pub fn login(&self, id: UserId, role: Role) {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = UserContext { id, role };
    }
}

impl AuthContext for StaticAuth {
    fn current_user(&self) -> UserContext {
        *self.user.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// File store that resolves every reference under a fixed base URL.
pub struct StaticFiles {
    base: String,
}

impl StaticFiles {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl FileStore for StaticFiles {
    async fn resolve(&self, attachment: &Attachment) -> Result<String, PrintdeskError> {
        Ok(format!("{}/{}", self.base, attachment.reference))
    }
}
