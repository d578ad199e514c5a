//! Authorization decisions for observing and acting on orders.
//!
//! Authorization facts (driver assignment in particular) change between
//! evaluations, so nothing here is cached: room joins re-load the order
//! and every state-changing action re-checks against the current record.

use std::sync::Arc;

use crate::domain::{Actor, Order, Role};
use crate::errors::DomainError;
use crate::store::OrderStore;
use crate::ws::protocol::RoomId;

/// State-changing actions gated by the guard. The transition table gates
/// *which* status moves are legal; this gates *who* may attempt them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Claim,
    Release,
    UpdateStatus,
    UpdateDetails,
    SendMessage,
    Reactivate,
    ShareLocation,
}

/// Whether `actor` may observe `order` at all.
///
/// Couriers get a read-only view of unclaimed pending orders so they can
/// decide whether to claim.
pub fn can_observe(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Operator => true,
        Role::Customer => order.client_id == actor.id,
        Role::Courier => order.driver_id == Some(actor.id) || order.is_unclaimed(),
    }
}

/// Whether `actor` may perform `action` on `order`.
pub fn can_act(actor: &Actor, order: &Order, action: Action) -> bool {
    match actor.role {
        Role::Operator => true,
        Role::Customer => {
            if order.client_id != actor.id {
                return false;
            }
            matches!(
                action,
                Action::UpdateStatus | Action::SendMessage | Action::Reactivate
            )
        }
        Role::Courier => match action {
            Action::Claim => order.is_unclaimed(),
            Action::Release | Action::UpdateStatus | Action::SendMessage | Action::ShareLocation => {
                order.driver_id == Some(actor.id)
            }
            Action::UpdateDetails | Action::Reactivate => false,
        },
    }
}

/// Room-join authorization. Holds a read-only handle on the order store
/// so order-room membership can be re-derived from the current record on
/// every join attempt.
pub struct AccessGuard {
    orders: Arc<dyn OrderStore>,
}

impl AccessGuard {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Re-derive whether `actor` may join `room` right now.
    pub async fn authorize_room(&self, actor: &Actor, room: RoomId) -> Result<(), DomainError> {
        match room {
            RoomId::Order(order_id) => {
                let order = self.orders.load(order_id).await?;
                if can_observe(actor, &order) {
                    Ok(())
                } else {
                    Err(DomainError::authorization(format!(
                        "{} {} is not a participant of order {order_id}",
                        actor.role, actor.id
                    )))
                }
            }
            RoomId::Actor(owner) => {
                if owner == actor.id || actor.is_operator() {
                    Ok(())
                } else {
                    Err(DomainError::authorization(
                        "personal rooms are joinable only by their owner",
                    ))
                }
            }
            RoomId::Discovery => match actor.role {
                Role::Courier | Role::Operator => Ok(()),
                Role::Customer => Err(DomainError::authorization(
                    "discovery is a courier-facing channel",
                )),
            },
        }
    }
}
