//! Static role-gated transition policy for order statuses.
//!
//! The claim (`Pending → Assigned`) and release (`Assigned → Pending`)
//! transitions are deliberately absent here: they also bind or clear
//! `driver_id` and are performed atomically by the assignment coordinator.
//! `Pending` is likewise never a regular target; it is reachable only
//! through the explicit reactivate operation.

use crate::domain::actor::Role;
use crate::domain::order::OrderStatus;

use OrderStatus::{
    Accepted, Assigned, Cancelled, Delivered, Failed, InTransit, PickedUp, Pending,
};

const CUSTOMER_CANCEL: &[OrderStatus] = &[Cancelled];

const COURIER_FROM_ASSIGNED: &[OrderStatus] = &[Accepted];
const COURIER_FROM_ACCEPTED: &[OrderStatus] = &[PickedUp];
const COURIER_FROM_PICKED_UP: &[OrderStatus] = &[InTransit];
const COURIER_FROM_IN_TRANSIT: &[OrderStatus] = &[Delivered];

/// Everything an operator may set directly. `Pending` is excluded by design.
const OPERATOR_TARGETS: &[OrderStatus] = &[
    Assigned, Accepted, PickedUp, InTransit, Delivered, Cancelled, Failed,
];

const NONE: &[OrderStatus] = &[];

/// Statuses `role` may move an order to from `from`.
pub fn allowed(role: Role, from: OrderStatus) -> &'static [OrderStatus] {
    match role {
        // Customers may only back out of an order that has not progressed
        // past assignment.
        Role::Customer => match from {
            Pending | Assigned => CUSTOMER_CANCEL,
            _ => NONE,
        },

        // Couriers walk the happy path one step at a time.
        Role::Courier => match from {
            Assigned => COURIER_FROM_ASSIGNED,
            Accepted => COURIER_FROM_ACCEPTED,
            PickedUp => COURIER_FROM_PICKED_UP,
            InTransit => COURIER_FROM_IN_TRANSIT,
            _ => NONE,
        },

        Role::Operator => OPERATOR_TARGETS,
    }
}

/// Whether `role` may move an order from `from` to `to`.
pub fn permits(role: Role, from: OrderStatus, to: OrderStatus) -> bool {
    allowed(role, from).contains(&to)
}
