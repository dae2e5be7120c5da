// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The order lifecycle state machine.
//!
//! All functions here are pure over order snapshots: they validate a
//! requested mutation and return the new snapshot, with no side effects.
//! Callers persist the result and publish the corresponding event.
//!
//! Legal moves: forward one step at a time (new -> processing -> ready ->
//! completed) and exactly one step backward as a correction, both shop-owner
//! only. A soft-deleted order accepts nothing. `completed` forbids forward
//! moves and messaging, but the one-step reverse to `ready` is the explicit
//! administrative exception that reopens the order.

use chrono::Utc;

use crate::error::PrintdeskError;
use crate::types::{Order, OrderStatus, Role};

/// The next status forward, if any.
pub fn forward_of(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::New => Some(OrderStatus::Processing),
        OrderStatus::Processing => Some(OrderStatus::Ready),
        OrderStatus::Ready => Some(OrderStatus::Completed),
        OrderStatus::Completed => None,
    }
}

/// The one-step correction backward, if any.
pub fn reverse_of(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::New => None,
        OrderStatus::Processing => Some(OrderStatus::New),
        OrderStatus::Ready => Some(OrderStatus::Processing),
        OrderStatus::Completed => Some(OrderStatus::Ready),
    }
}

/// Statuses the order may legally move to right now.
pub fn legal_transitions(order: &Order) -> Vec<OrderStatus> {
    if order.is_deleted() {
        return Vec::new();
    }
    forward_of(order.status)
        .into_iter()
        .chain(reverse_of(order.status))
        .collect()
}

/// Validate and apply a status change, returning the new snapshot.
///
/// Only the shop owner may move status, forward or backward, one step at a
/// time. Requesting the current status, skipping a state, or moving a
/// deleted order are all rejected.
pub fn transition(
    order: &Order,
    requested: OrderStatus,
    actor: Role,
) -> Result<Order, PrintdeskError> {
    if order.is_deleted() {
        return Err(PrintdeskError::order_terminal(order));
    }
    if actor != Role::ShopOwner {
        return Err(PrintdeskError::ForbiddenRole {
            role: actor,
            action: "change order status".into(),
        });
    }
    let legal = forward_of(order.status) == Some(requested)
        || reverse_of(order.status) == Some(requested);
    if !legal {
        return Err(PrintdeskError::IllegalTransition {
            from: order.status,
            to: requested,
        });
    }
    Ok(Order {
        status: requested,
        ..order.clone()
    })
}

/// Validate and apply a soft delete, returning the new snapshot.
///
/// A customer may delete (cancel) only while the order is still `new`; the
/// shop owner may delete in any non-completed state. Message history is
/// never removed by deletion.
pub fn soft_delete(order: &Order, actor: Role) -> Result<Order, PrintdeskError> {
    if order.is_deleted() {
        return Err(PrintdeskError::order_terminal(order));
    }
    match actor {
        Role::Customer => {
            if order.status != OrderStatus::New {
                return Err(PrintdeskError::ForbiddenRole {
                    role: actor,
                    action: format!("delete an order in status {}", order.status),
                });
            }
        }
        Role::ShopOwner => {
            if order.status == OrderStatus::Completed {
                return Err(PrintdeskError::order_terminal(order));
            }
        }
    }
    Ok(Order {
        deleted_at: Some(Utc::now()),
        ..order.clone()
    })
}

/// Validate and apply the urgent flag, returning the new snapshot.
///
/// Shop-owner only, and only while the order is not terminal.
pub fn set_urgent(order: &Order, urgent: bool, actor: Role) -> Result<Order, PrintdeskError> {
    if order.is_terminal() {
        return Err(PrintdeskError::order_terminal(order));
    }
    if actor != Role::ShopOwner {
        return Err(PrintdeskError::ForbiddenRole {
            role: actor,
            action: "toggle the urgent flag".into(),
        });
    }
    Ok(Order {
        is_urgent: urgent,
        ..order.clone()
    })
}

/// Reject writes (new messages) against a completed or deleted order.
///
/// Checked against the current snapshot only: a reverse transition out of
/// `completed` re-enables messaging immediately.
pub fn ensure_writable(order: &Order) -> Result<(), PrintdeskError> {
    if order.is_terminal() {
        return Err(PrintdeskError::order_terminal(order));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, OrderType, UserId};
    use proptest::prelude::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId(1),
            order_type: OrderType::Upload,
            status,
            is_urgent: false,
            customer_id: UserId(10),
            shop_owner_id: UserId(20),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn deleted(status: OrderStatus) -> Order {
        Order {
            deleted_at: Some(Utc::now()),
            ..order(status)
        }
    }

    const ALL: [OrderStatus; 4] = [
        OrderStatus::New,
        OrderStatus::Processing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ];

    #[test]
    fn forward_chain_one_step_at_a_time() {
        let o = order(OrderStatus::New);
        let o = transition(&o, OrderStatus::Processing, Role::ShopOwner).unwrap();
        let o = transition(&o, OrderStatus::Ready, Role::ShopOwner).unwrap();
        let o = transition(&o, OrderStatus::Completed, Role::ShopOwner).unwrap();
        assert_eq!(o.status, OrderStatus::Completed);
    }

    #[test]
    fn skipping_forward_is_illegal() {
        let err = transition(&order(OrderStatus::New), OrderStatus::Ready, Role::ShopOwner)
            .unwrap_err();
        assert!(matches!(err, PrintdeskError::IllegalTransition { .. }));
    }

    #[test]
    fn two_step_reverse_is_illegal_but_one_step_is_not() {
        // ready -> new skips processing.
        let err =
            transition(&order(OrderStatus::Ready), OrderStatus::New, Role::ShopOwner).unwrap_err();
        assert!(matches!(err, PrintdeskError::IllegalTransition { .. }));

        let o = transition(
            &order(OrderStatus::Ready),
            OrderStatus::Processing,
            Role::ShopOwner,
        )
        .unwrap();
        assert_eq!(o.status, OrderStatus::Processing);
    }

    #[test]
    fn customer_may_never_move_status() {
        for from in ALL {
            for to in ALL {
                let err = transition(&order(from), to, Role::Customer).unwrap_err();
                assert!(matches!(err, PrintdeskError::ForbiddenRole { .. }));
            }
        }
    }

    #[test]
    fn completed_reopens_only_to_ready() {
        let completed = order(OrderStatus::Completed);
        let reopened =
            transition(&completed, OrderStatus::Ready, Role::ShopOwner).unwrap();
        assert_eq!(reopened.status, OrderStatus::Ready);
        // Reopening re-enables messaging immediately.
        assert!(ensure_writable(&reopened).is_ok());

        for to in [OrderStatus::New, OrderStatus::Processing, OrderStatus::Completed] {
            assert!(transition(&completed, to, Role::ShopOwner).is_err());
        }
    }

    #[test]
    fn deleted_order_accepts_nothing() {
        for from in ALL {
            for to in ALL {
                let err = transition(&deleted(from), to, Role::ShopOwner).unwrap_err();
                assert!(matches!(err, PrintdeskError::OrderTerminal { .. }));
            }
        }
    }

    #[test]
    fn customer_delete_only_while_new() {
        let o = soft_delete(&order(OrderStatus::New), Role::Customer).unwrap();
        assert!(o.is_deleted());

        for status in [OrderStatus::Processing, OrderStatus::Ready, OrderStatus::Completed] {
            let err = soft_delete(&order(status), Role::Customer).unwrap_err();
            assert!(matches!(err, PrintdeskError::ForbiddenRole { .. }));
        }
    }

    #[test]
    fn shop_owner_delete_any_non_completed_state() {
        for status in [OrderStatus::New, OrderStatus::Processing, OrderStatus::Ready] {
            let o = soft_delete(&order(status), Role::ShopOwner).unwrap();
            assert!(o.is_deleted());
        }
        let err = soft_delete(&order(OrderStatus::Completed), Role::ShopOwner).unwrap_err();
        assert!(matches!(err, PrintdeskError::OrderTerminal { .. }));
    }

    #[test]
    fn double_delete_is_terminal() {
        let o = soft_delete(&order(OrderStatus::New), Role::ShopOwner).unwrap();
        let err = soft_delete(&o, Role::ShopOwner).unwrap_err();
        assert!(matches!(err, PrintdeskError::OrderTerminal { .. }));
    }

    #[test]
    fn urgent_flag_gating() {
        let o = set_urgent(&order(OrderStatus::Processing), true, Role::ShopOwner).unwrap();
        assert!(o.is_urgent);

        assert!(matches!(
            set_urgent(&order(OrderStatus::Processing), true, Role::Customer),
            Err(PrintdeskError::ForbiddenRole { .. })
        ));
        assert!(matches!(
            set_urgent(&order(OrderStatus::Completed), true, Role::ShopOwner),
            Err(PrintdeskError::OrderTerminal { .. })
        ));
    }

    #[test]
    fn legal_transitions_match_transition_fn() {
        for from in ALL {
            let o = order(from);
            let legal = legal_transitions(&o);
            for to in ALL {
                let accepted = transition(&o, to, Role::ShopOwner).is_ok();
                assert_eq!(legal.contains(&to), accepted, "{from} -> {to}");
            }
        }
        assert!(legal_transitions(&deleted(OrderStatus::New)).is_empty());
    }

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        // Any accepted move is exactly one step along the chain, in either
        // direction; everything else is rejected.
        #[test]
        fn transition_never_skips(from in any_status(), to in any_status()) {
            let result = transition(&order(from), to, Role::ShopOwner);
            let one_step = forward_of(from) == Some(to) || reverse_of(from) == Some(to);
            prop_assert_eq!(result.is_ok(), one_step);
            if let Ok(next) = result {
                prop_assert_eq!(next.status, to);
            }
        }

        // A deleted order rejects every move for every role.
        #[test]
        fn deleted_is_terminal_for_all(from in any_status(), to in any_status()) {
            prop_assert!(transition(&deleted(from), to, Role::ShopOwner).is_err());
            prop_assert!(transition(&deleted(from), to, Role::Customer).is_err());
        }
    }
}
