// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Watermark reconciliation for one order's message log.
//!
//! The push channel may drop, reorder, or redeliver events, and a poll
//! batch can overlap with pushes that already arrived. [`Reconciler`]
//! merges both feeds into a single strictly-increasing sequence: each
//! message id is compared against the highest contiguously-applied id
//! (the watermark) and classified as fresh, duplicate, or evidence of a
//! gap that needs a store fetch.

use printdesk_core::{Message, MessageId};

/// Outcome of offering one pushed message to the reconciler.
#[derive(Debug)]
pub enum Applied {
    /// The message extends the contiguous prefix; deliver it.
    Fresh(Message),
    /// Already at or below the watermark; drop silently.
    Duplicate,
    /// The id skips ahead of the watermark. The caller must fetch
    /// `list_since(watermark)` and [`Reconciler::merge`] the result
    /// before this message's content is visible.
    Gap { expected: MessageId, got: MessageId },
}

/// Per-order merge state. One reconciler lives inside each subscription
/// actor; it is not shared.
#[derive(Debug)]
pub struct Reconciler {
    watermark: Option<MessageId>,
}

impl Reconciler {
    pub fn new(watermark: Option<MessageId>) -> Self {
        Self { watermark }
    }

    /// Highest contiguously-applied message id, `None` before any
    /// message has been seen.
    pub fn watermark(&self) -> Option<MessageId> {
        self.watermark
    }

    fn expected_next(&self) -> MessageId {
        self.watermark.map_or(MessageId::FIRST, MessageId::next)
    }

    /// Classify one pushed message against the watermark.
    pub fn offer(&mut self, message: Message) -> Applied {
        let expected = self.expected_next();
        if message.id < expected {
            Applied::Duplicate
        } else if message.id == expected {
            self.watermark = Some(message.id);
            Applied::Fresh(message)
        } else {
            Applied::Gap {
                expected,
                got: message.id,
            }
        }
    }

    /// Merge a `list_since(watermark)` batch, returning only the
    /// messages not yet applied, oldest first. Safe to call with a batch
    /// that overlaps already-pushed messages.
    pub fn merge(&mut self, mut batch: Vec<Message>) -> Vec<Message> {
        batch.sort_by_key(|m| m.id);
        let mut fresh = Vec::new();
        for message in batch {
            if self.watermark.is_none_or(|w| message.id > w) {
                self.watermark = Some(message.id);
                fresh.push(message);
            }
        }
        fresh
    }

    /// Replace the watermark wholesale after a full resync.
    pub fn reset(&mut self, watermark: Option<MessageId>) {
        self.watermark = watermark;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use printdesk_core::{OrderId, Role, UserId};
    use proptest::prelude::*;

    fn msg(id: i64) -> Message {
        Message {
            id: MessageId(id),
            order_id: OrderId(1),
            sender_id: UserId(10),
            sender_role: Role::Customer,
            content: format!("m{id}"),
            attachments: Vec::new(),
            created_at: Utc::now(),
            read_by: Vec::new(),
        }
    }

    #[test]
    fn contiguous_pushes_apply_in_order() {
        let mut r = Reconciler::new(None);
        assert!(matches!(r.offer(msg(1)), Applied::Fresh(_)));
        assert!(matches!(r.offer(msg(2)), Applied::Fresh(_)));
        assert_eq!(r.watermark(), Some(MessageId(2)));
    }

    #[test]
    fn redelivery_is_a_silent_duplicate() {
        let mut r = Reconciler::new(Some(MessageId(3)));
        assert!(matches!(r.offer(msg(2)), Applied::Duplicate));
        assert!(matches!(r.offer(msg(3)), Applied::Duplicate));
        assert_eq!(r.watermark(), Some(MessageId(3)));
    }

    #[test]
    fn skipped_id_reports_a_gap_without_moving_the_watermark() {
        let mut r = Reconciler::new(Some(MessageId(3)));
        match r.offer(msg(6)) {
            Applied::Gap { expected, got } => {
                assert_eq!(expected, MessageId(4));
                assert_eq!(got, MessageId(6));
            }
            other => panic!("expected gap, got {other:?}"),
        }
        assert_eq!(r.watermark(), Some(MessageId(3)));
    }

    #[test]
    fn merge_skips_already_applied_and_sorts() {
        let mut r = Reconciler::new(Some(MessageId(2)));
        let fresh = r.merge(vec![msg(4), msg(1), msg(3), msg(2)]);
        let ids: Vec<i64> = fresh.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(r.watermark(), Some(MessageId(4)));
    }

    #[test]
    fn gap_then_merge_then_duplicate_push() {
        // Push 5 arrives before pushes 4; the gap fill delivers both, and
        // the late push for 5 lands as a duplicate.
        let mut r = Reconciler::new(Some(MessageId(3)));
        assert!(matches!(r.offer(msg(5)), Applied::Gap { .. }));
        let fresh = r.merge(vec![msg(4), msg(5)]);
        assert_eq!(fresh.len(), 2);
        assert!(matches!(r.offer(msg(5)), Applied::Duplicate));
    }

    proptest! {
        /// Any interleaving of redundant pushes and overlapping batches
        /// produces each id at most once, in increasing order.
        #[test]
        fn delivery_is_exactly_once_and_ordered(
            pushes in proptest::collection::vec(1i64..20, 0..40),
            batches in proptest::collection::vec(
                proptest::collection::vec(1i64..20, 0..20), 0..5),
        ) {
            let mut r = Reconciler::new(None);
            let mut delivered = Vec::new();
            for id in pushes {
                if let Applied::Fresh(m) = r.offer(msg(id)) {
                    delivered.push(m.id.0);
                }
            }
            for batch in batches {
                for m in r.merge(batch.into_iter().map(msg).collect()) {
                    delivered.push(m.id.0);
                }
            }
            let mut sorted = delivered.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(delivered, sorted);
        }
    }
}
