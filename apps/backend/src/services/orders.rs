//! OrderCoordinator: the facade every request and socket handler goes
//! through.
//!
//! Composition per operation: AccessGuard check, TransitionTable
//! validation, one atomic store write, then fan-out through the injected
//! PresenceHub. The hub is passed in explicitly; there is no ambient
//! global broadcaster.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;

use crate::domain::{
    transitions, Actor, Message, MessageKind, NewMessage, Order, OrderId, OrderStatus, Role,
};
use crate::errors::DomainError;
use crate::services::access::{self, Action};
use crate::services::assignment::AssignmentCoordinator;
use crate::store::{DriverChange, MessageStore, OrderChange, OrderStore, Precondition};
use crate::ws::hub::PresenceHub;
use crate::ws::protocol::{RoomId, ServerMsg};

/// Payload for creating an order. Everything here is opaque to the core.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewOrder {
    pub content: String,
    pub price: Option<String>,
    pub address_ref: Option<String>,
}

/// Operator correction of payload fields, without a status change.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DetailsPatch {
    pub content: Option<String>,
    pub price: Option<String>,
    pub address_ref: Option<String>,
}

pub struct OrderCoordinator {
    orders: Arc<dyn OrderStore>,
    messages: Arc<dyn MessageStore>,
    assignment: AssignmentCoordinator,
    hub: Arc<PresenceHub>,
}

impl OrderCoordinator {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        messages: Arc<dyn MessageStore>,
        hub: Arc<PresenceHub>,
    ) -> Self {
        let assignment = AssignmentCoordinator::new(orders.clone());
        Self {
            orders,
            messages,
            assignment,
            hub,
        }
    }

    pub fn hub(&self) -> Arc<PresenceHub> {
        self.hub.clone()
    }

    /// Create a pending order and announce it to eligible couriers on the
    /// discovery channel (no order room exists yet for them to be in).
    pub async fn create_order(
        &self,
        customer: &Actor,
        new_order: NewOrder,
    ) -> Result<Order, DomainError> {
        if customer.role != Role::Customer {
            return Err(DomainError::authorization(
                "orders are created by customers",
            ));
        }
        if new_order.content.trim().is_empty() {
            return Err(DomainError::validation("order content must not be empty"));
        }

        let order = Order::new(
            customer.id,
            new_order.content,
            new_order.price,
            new_order.address_ref,
            OffsetDateTime::now_utc(),
        );
        let order = self.orders.insert(order).await?;

        info!(order_id = %order.id, client_id = %order.client_id, "order created");
        self.hub.broadcast(
            RoomId::Discovery,
            ServerMsg::OrderCreated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    pub async fn get_order(&self, order_id: OrderId, actor: &Actor) -> Result<Order, DomainError> {
        let order = self.orders.load(order_id).await?;
        if !access::can_observe(actor, &order) {
            return Err(DomainError::authorization(format!(
                "{} {} may not observe order {order_id}",
                actor.role, actor.id
            )));
        }
        Ok(order)
    }

    /// Courier claims a pending order. Exactly one concurrent caller wins;
    /// the rest get ConflictError and should refresh their pending list.
    pub async fn accept_order(&self, order_id: OrderId, courier: &Actor) -> Result<Order, DomainError> {
        if courier.role != Role::Courier {
            return Err(DomainError::authorization("only couriers claim orders"));
        }

        let order = self.assignment.claim(order_id, courier.id).await?;

        // Tell other couriers the order is gone, then update the room.
        self.hub.broadcast(
            RoomId::Discovery,
            ServerMsg::OrderAssigned {
                order_id,
                driver_id: order.driver_id,
                status: order.status,
            },
        );
        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::OrderStatusUpdated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    /// Courier-initiated reject of an assignment it still holds; the order
    /// goes back into the discovery pool.
    pub async fn reject_order(&self, order_id: OrderId, courier: &Actor) -> Result<Order, DomainError> {
        if courier.role != Role::Courier {
            return Err(DomainError::authorization("only couriers reject orders"));
        }

        let order = self.assignment.release(order_id, courier.id).await?;

        self.hub.broadcast(
            RoomId::Discovery,
            ServerMsg::OrderAssigned {
                order_id,
                driver_id: None,
                status: order.status,
            },
        );
        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::OrderStatusUpdated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    /// Role-gated status transition. The conditional write is keyed on the
    /// status the caller was validated against, so a concurrent transition
    /// surfaces as ConflictError rather than a silent lost update. Courier
    /// writes are additionally gated on the courier still holding the order:
    /// a release-and-reclaim between the load and the write restores the
    /// observed status, and a status-only check would let the stale courier
    /// advance an order now bound to someone else.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        actor: &Actor,
        target: OrderStatus,
    ) -> Result<Order, DomainError> {
        let current = self.orders.load(order_id).await?;

        if !access::can_act(actor, &current, Action::UpdateStatus) {
            return Err(DomainError::authorization(format!(
                "{} {} may not act on order {order_id}",
                actor.role, actor.id
            )));
        }
        if !transitions::permits(actor.role, current.status, target) {
            return Err(DomainError::invalid_transition(
                actor.role,
                current.status,
                target,
            ));
        }
        if target.requires_driver() && current.driver_id.is_none() {
            return Err(DomainError::validation(format!(
                "order {order_id} has no courier bound; {target} needs one"
            )));
        }

        let pre = if actor.role == Role::Courier {
            Precondition::held_in(current.status, actor.id)
        } else {
            Precondition::status_is(current.status)
        };
        let order = self
            .orders
            .update_where(order_id, pre, OrderChange::to_status(target))
            .await?;

        info!(order_id = %order_id, actor_id = %actor.id, from = %current.status, to = %target, "order status updated");
        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::OrderStatusUpdated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    /// Operator payload correction outside the status path. Runs through
    /// the same conditional-write discipline as status changes.
    pub async fn update_details(
        &self,
        order_id: OrderId,
        actor: &Actor,
        patch: DetailsPatch,
    ) -> Result<Order, DomainError> {
        let current = self.orders.load(order_id).await?;
        if !access::can_act(actor, &current, Action::UpdateDetails) {
            return Err(DomainError::authorization(
                "only operators correct order details",
            ));
        }

        let change = OrderChange {
            status: None,
            driver: DriverChange::Keep,
            content: patch.content,
            price: patch.price,
            address_ref: patch.address_ref,
        };
        let order = self
            .orders
            .update_where(order_id, Precondition::status_is(current.status), change)
            .await?;

        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::OrderUpdated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    /// Put a finished order back into play. Operator or owning customer,
    /// from Delivered or Cancelled only; a cancelled order loses its
    /// courier binding, a delivered one keeps it on record.
    pub async fn reactivate(&self, order_id: OrderId, actor: &Actor) -> Result<Order, DomainError> {
        let current = self.orders.load(order_id).await?;

        if !access::can_act(actor, &current, Action::Reactivate) {
            return Err(DomainError::authorization(
                "reactivation is limited to the operator or the owning customer",
            ));
        }
        if !matches!(current.status, OrderStatus::Delivered | OrderStatus::Cancelled) {
            return Err(DomainError::invalid_transition(
                actor.role,
                current.status,
                OrderStatus::Pending,
            ));
        }

        let driver = if current.status == OrderStatus::Cancelled {
            DriverChange::Clear
        } else {
            DriverChange::Keep
        };
        let order = self
            .orders
            .update_where(
                order_id,
                Precondition::status_is(current.status),
                OrderChange {
                    status: Some(OrderStatus::Pending),
                    driver,
                    ..OrderChange::default()
                },
            )
            .await?;

        info!(order_id = %order_id, actor_id = %actor.id, "order reactivated");
        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::OrderStatusUpdated {
                order: order.clone(),
            },
        );
        self.hub.broadcast(
            RoomId::Discovery,
            ServerMsg::OrderCreated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    /// Persist a chat message (the store assigns its sequence number) and
    /// fan it out to the order room plus each counterpart's inbox.
    pub async fn send_message(
        &self,
        order_id: OrderId,
        from: &Actor,
        content: String,
    ) -> Result<Message, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::validation("message content must not be empty"));
        }

        let order = self.orders.load(order_id).await?;
        if !access::can_act(from, &order, Action::SendMessage) {
            return Err(DomainError::authorization(format!(
                "{} {} may not message order {order_id}",
                from.role, from.id
            )));
        }

        let mut recipients: Vec<_> = [Some(order.client_id), order.driver_id]
            .into_iter()
            .flatten()
            .filter(|id| *id != from.id)
            .collect();
        recipients.dedup();

        let message = self
            .messages
            .append(NewMessage {
                order_id: Some(order_id),
                from_actor_id: from.id,
                to_actor_id: recipients.first().copied(),
                content,
                kind: MessageKind::Text,
            })
            .await?;

        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::MessageReceived {
                message: message.clone(),
            },
        );
        for recipient in recipients {
            self.hub.broadcast(
                RoomId::Actor(recipient),
                ServerMsg::MessageReceived {
                    message: message.clone(),
                },
            );
        }
        Ok(message)
    }

    /// Courier position ping; relayed, never persisted.
    pub async fn share_location(
        &self,
        order_id: OrderId,
        courier: &Actor,
        lat: f64,
        lng: f64,
        status: Option<String>,
    ) -> Result<(), DomainError> {
        if courier.role != Role::Courier {
            return Err(DomainError::authorization(
                "location updates come from couriers",
            ));
        }
        let order = self.orders.load(order_id).await?;
        if !access::can_act(courier, &order, Action::ShareLocation) {
            return Err(DomainError::authorization(format!(
                "courier {} is not bound to order {order_id}",
                courier.id
            )));
        }

        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::DriverLocationUpdated {
                order_id,
                driver_id: courier.id,
                lat,
                lng,
                status,
            },
        );
        Ok(())
    }

    /// Typing indicator fan-out to the order room.
    pub async fn set_typing(
        &self,
        order_id: OrderId,
        actor: &Actor,
        typing: bool,
    ) -> Result<(), DomainError> {
        let order = self.orders.load(order_id).await?;
        if !access::can_observe(actor, &order) {
            return Err(DomainError::authorization(format!(
                "{} {} may not observe order {order_id}",
                actor.role, actor.id
            )));
        }

        self.hub.broadcast(
            RoomId::Order(order_id),
            ServerMsg::UserTyping {
                order_id,
                actor_id: actor.id,
                typing,
            },
        );
        Ok(())
    }
}
