//! Persistence interfaces consumed by the coordination core.
//!
//! The backing implementation is a collaborator; the core only requires
//! that `update_where` be a single indivisible conditional write. A plain
//! read-then-write sequence is not expressible through this interface,
//! which is what keeps the claim race single-winner.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{ActorId, Message, NewMessage, Order, OrderId, OrderStatus};
use crate::errors::{ConflictKind, DomainError, NotFoundKind};

pub mod memory;

pub use memory::{MemoryMessageStore, MemoryOrderStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order {0} not found")]
    NotFound(OrderId),
    /// The conditional write's precondition did not hold; carries the
    /// order as it currently stands.
    #[error("precondition failed for order {}", current.id)]
    PreconditionFailed { current: Box<Order> },
    /// The per-order lock could not be acquired within the bounded timeout.
    #[error("order {0} is busy")]
    Busy(OrderId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => {
                DomainError::not_found(NotFoundKind::Order, format!("order {id} not found"))
            }
            StoreError::PreconditionFailed { current } => DomainError::conflict(
                ConflictKind::StaleState,
                format!("order {} changed concurrently", current.id),
            ),
            StoreError::Busy(id) => {
                DomainError::conflict(ConflictKind::Busy, format!("order {id} is busy"))
            }
            StoreError::Unavailable(detail) => DomainError::internal(detail),
        }
    }
}

/// Gate on the courier binding of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverGate {
    /// Do not constrain `driver_id`.
    Any,
    /// `driver_id` must be unset (claim precondition).
    Vacant,
    /// `driver_id` must be exactly this courier (release precondition).
    Held(ActorId),
}

/// Precondition evaluated by the same atomic operation that performs the
/// write.
#[derive(Debug, Clone, Copy)]
pub struct Precondition {
    pub status: Option<OrderStatus>,
    pub driver: DriverGate,
}

impl Precondition {
    pub fn status_is(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            driver: DriverGate::Any,
        }
    }

    pub fn claimable() -> Self {
        Self {
            status: Some(OrderStatus::Pending),
            driver: DriverGate::Vacant,
        }
    }

    pub fn held_in(status: OrderStatus, courier: ActorId) -> Self {
        Self {
            status: Some(status),
            driver: DriverGate::Held(courier),
        }
    }

    pub fn holds(&self, order: &Order) -> bool {
        if let Some(expected) = self.status {
            if order.status != expected {
                return false;
            }
        }
        match self.driver {
            DriverGate::Any => true,
            DriverGate::Vacant => order.driver_id.is_none(),
            DriverGate::Held(courier) => order.driver_id == Some(courier),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverChange {
    #[default]
    Keep,
    Assign(ActorId),
    Clear,
}

/// The mutation half of a conditional write. Timestamps are stamped via
/// `Order::enter_status` when a status change is requested.
#[derive(Debug, Clone, Default)]
pub struct OrderChange {
    pub status: Option<OrderStatus>,
    pub driver: DriverChange,
    pub content: Option<String>,
    pub price: Option<String>,
    pub address_ref: Option<String>,
}

impl OrderChange {
    pub fn to_status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn assign(courier: ActorId) -> Self {
        Self {
            status: Some(OrderStatus::Assigned),
            driver: DriverChange::Assign(courier),
            ..Self::default()
        }
    }

    pub fn release() -> Self {
        Self {
            status: Some(OrderStatus::Pending),
            driver: DriverChange::Clear,
            ..Self::default()
        }
    }

    pub fn apply(&self, order: &mut Order, now: OffsetDateTime) {
        match self.driver {
            DriverChange::Keep => {}
            DriverChange::Assign(courier) => order.driver_id = Some(courier),
            DriverChange::Clear => order.driver_id = None,
        }
        if let Some(status) = self.status {
            order.enter_status(status, now);
        } else {
            order.updated_at = now;
        }
        if let Some(content) = &self.content {
            order.content = content.clone();
        }
        if let Some(price) = &self.price {
            order.price = Some(price.clone());
        }
        if let Some(address_ref) = &self.address_ref {
            order.address_ref = Some(address_ref.clone());
        }
    }
}

/// Order persistence. All writes to a single order are serialized by the
/// implementation; `update_where` checks its precondition and applies the
/// change as one indivisible operation.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<Order, StoreError>;

    async fn load(&self, id: OrderId) -> Result<Order, StoreError>;

    async fn update_where(
        &self,
        id: OrderId,
        pre: Precondition,
        change: OrderChange,
    ) -> Result<Order, StoreError>;
}

/// Message persistence. Assigns the per-order monotonic sequence number
/// as part of the append.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: NewMessage) -> Result<Message, StoreError>;
}
