#![cfg(test)]

use crate::domain::transitions::{allowed, permits};
use crate::domain::{OrderStatus, Role};

use OrderStatus::{
    Accepted, Assigned, Cancelled, Delivered, Failed, InTransit, PickedUp, Pending,
};

#[test]
fn customer_can_only_cancel_early() {
    assert!(permits(Role::Customer, Pending, Cancelled));
    assert!(permits(Role::Customer, Assigned, Cancelled));

    // Once the courier has accepted, the customer is locked out.
    assert!(!permits(Role::Customer, Accepted, Cancelled));
    assert!(!permits(Role::Customer, PickedUp, Cancelled));
    assert!(!permits(Role::Customer, InTransit, Cancelled));
    assert!(!permits(Role::Customer, Delivered, Cancelled));

    // And cancellation is all a customer ever gets.
    for to in OrderStatus::ALL {
        if to != Cancelled {
            assert!(!permits(Role::Customer, Pending, to), "customer pending -> {to}");
            assert!(!permits(Role::Customer, Assigned, to), "customer assigned -> {to}");
        }
    }
}

#[test]
fn courier_walks_the_happy_path_in_order() {
    assert_eq!(allowed(Role::Courier, Assigned), &[Accepted]);
    assert_eq!(allowed(Role::Courier, Accepted), &[PickedUp]);
    assert_eq!(allowed(Role::Courier, PickedUp), &[InTransit]);
    assert_eq!(allowed(Role::Courier, InTransit), &[Delivered]);
}

#[test]
fn courier_cannot_skip_steps_or_go_backwards() {
    assert!(!permits(Role::Courier, Assigned, PickedUp));
    assert!(!permits(Role::Courier, Assigned, Delivered));
    assert!(!permits(Role::Courier, InTransit, PickedUp));
    assert!(!permits(Role::Courier, Delivered, InTransit));
    // Claim and release are not table transitions.
    assert!(!permits(Role::Courier, Pending, Assigned));
    assert!(!permits(Role::Courier, Assigned, Pending));
    // Couriers never cancel or fail orders themselves.
    assert!(!permits(Role::Courier, Assigned, Cancelled));
    assert!(!permits(Role::Courier, InTransit, Failed));
}

#[test]
fn terminal_states_offer_no_courier_or_customer_moves() {
    for from in [Delivered, Cancelled, Failed] {
        assert!(allowed(Role::Courier, from).is_empty(), "courier from {from}");
        if from != Delivered {
            assert!(allowed(Role::Customer, from).is_empty(), "customer from {from}");
        }
    }
}

#[test]
fn operator_reaches_everything_except_pending() {
    for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
            let expected = to != Pending;
            assert_eq!(
                permits(Role::Operator, from, to),
                expected,
                "operator {from} -> {to}"
            );
        }
    }
}
