#![cfg(test)]

use proptest::prelude::*;

use crate::domain::transitions::{allowed, permits};
use crate::domain::{OrderStatus, Role};

fn any_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Customer),
        Just(Role::Courier),
        Just(Role::Operator),
    ]
}

fn any_status() -> impl Strategy<Value = OrderStatus> {
    proptest::sample::select(OrderStatus::ALL.to_vec())
}

/// Index on the happy path, if the status is on it.
fn happy_path_index(status: OrderStatus) -> Option<usize> {
    [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::Accepted,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ]
    .iter()
    .position(|s| *s == status)
}

proptest! {
    /// No role reaches `Pending` through the table; only the explicit
    /// claim-release/reactivate operations may produce it.
    #[test]
    fn pending_is_never_a_table_target(role in any_role(), from in any_status()) {
        prop_assert!(!permits(role, from, OrderStatus::Pending));
    }

    /// `permits` agrees with the advertised target sets.
    #[test]
    fn permits_matches_allowed(role in any_role(), from in any_status(), to in any_status()) {
        prop_assert_eq!(permits(role, from, to), allowed(role, from).contains(&to));
    }

    /// Customers never get anything beyond cancellation.
    #[test]
    fn customer_targets_are_cancel_only(from in any_status()) {
        for to in allowed(Role::Customer, from) {
            prop_assert_eq!(*to, OrderStatus::Cancelled);
        }
    }

    /// A permitted courier move advances the happy path by exactly one step.
    #[test]
    fn courier_moves_are_single_steps(from in any_status(), to in any_status()) {
        if permits(Role::Courier, from, to) {
            let from_idx = happy_path_index(from).expect("courier source on happy path");
            let to_idx = happy_path_index(to).expect("courier target on happy path");
            prop_assert_eq!(to_idx, from_idx + 1);
        }
    }
}
