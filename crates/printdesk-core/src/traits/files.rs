// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File storage collaborator. Attachments are opaque references in this
//! core; resolution to a downloadable URL is the only operation consumed.

use async_trait::async_trait;

use crate::error::PrintdeskError;
use crate::types::Attachment;

/// Resolves attachment references to downloadable URLs.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// A URL the presentation layer can hand to the browser. `NotFound`
    /// when the reference no longer resolves.
    async fn resolve(&self, attachment: &Attachment) -> Result<String, PrintdeskError>;
}
