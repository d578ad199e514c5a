//! Atomic single-winner assignment of pending orders to couriers.
//!
//! Many couriers race for the same unclaimed order; exactly one wins. The
//! precondition is evaluated by the same atomic store operation that
//! performs the write, so a read-then-decide-then-write race cannot
//! occur. Losing is a normal outcome, reported as `ConflictError`.

use std::sync::Arc;

use tracing::info;

use crate::domain::{ActorId, Order, OrderId, OrderStatus};
use crate::errors::{ConflictKind, DomainError};
use crate::store::{OrderChange, OrderStore, Precondition, StoreError};

pub struct AssignmentCoordinator {
    orders: Arc<dyn OrderStore>,
}

impl AssignmentCoordinator {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Bind a pending, unclaimed order to `courier_id`.
    ///
    /// Exactly one concurrent caller observes success; every other caller
    /// gets `ConflictError { reason: already_assigned }`.
    pub async fn claim(&self, order_id: OrderId, courier_id: ActorId) -> Result<Order, DomainError> {
        let result = self
            .orders
            .update_where(
                order_id,
                Precondition::claimable(),
                OrderChange::assign(courier_id),
            )
            .await;

        match result {
            Ok(order) => {
                info!(order_id = %order_id, courier_id = %courier_id, "order claimed");
                Ok(order)
            }
            Err(StoreError::PreconditionFailed { .. }) | Err(StoreError::Busy(_)) => {
                Err(DomainError::conflict(
                    ConflictKind::AlreadyAssigned,
                    format!("order {order_id} is no longer available"),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Courier-initiated reject: put an assigned order back into the pool.
    ///
    /// Succeeds only while the caller still holds the order in `Assigned`;
    /// an order that was accepted or reassigned in the meantime yields
    /// `ConflictError`.
    pub async fn release(
        &self,
        order_id: OrderId,
        courier_id: ActorId,
    ) -> Result<Order, DomainError> {
        let result = self
            .orders
            .update_where(
                order_id,
                Precondition::held_in(OrderStatus::Assigned, courier_id),
                OrderChange::release(),
            )
            .await;

        match result {
            Ok(order) => {
                info!(order_id = %order_id, courier_id = %courier_id, "order released");
                Ok(order)
            }
            Err(StoreError::PreconditionFailed { .. }) | Err(StoreError::Busy(_)) => {
                Err(DomainError::conflict(
                    ConflictKind::StaleState,
                    format!("order {order_id} is not held by this courier in assigned state"),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}
