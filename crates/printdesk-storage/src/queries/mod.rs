// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table group.

pub mod cursors;
pub mod messages;
pub mod notifications;
pub mod orders;
