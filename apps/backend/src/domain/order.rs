use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::actor::ActorId;

pub type OrderId = Uuid;

/// Lifecycle states of a delivery order.
///
/// Happy path: `Pending → Assigned → Accepted → PickedUp → InTransit →
/// Delivered`. `Cancelled` and `Failed` are side-exits. `Pending` is
/// reachable again only through the explicit reactivate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::Accepted,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Failed,
    ];

    /// Statuses that only make sense with a courier bound to the order.
    pub fn requires_driver(&self) -> bool {
        matches!(
            self,
            OrderStatus::Assigned
                | OrderStatus::Accepted
                | OrderStatus::PickedUp
                | OrderStatus::InTransit
                | OrderStatus::Delivered
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Accepted => "accepted",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery order. Never physically deleted; cancellation is a status.
///
/// `content`, `price` and `address_ref` are opaque payload fields carried
/// for the clients; this core does not interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Owning customer. Required, immutable.
    pub client_id: ActorId,
    /// Courier currently (or last) bound to the order. Claiming requires
    /// this to be vacant; release and reactivate-from-cancelled clear it.
    pub driver_id: Option<ActorId>,
    pub status: OrderStatus,
    pub content: String,
    pub price: Option<String>,
    pub address_ref: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub picked_up_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
}

impl Order {
    pub fn new(
        client_id: ActorId,
        content: String,
        price: Option<String>,
        address_ref: Option<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            driver_id: None,
            status: OrderStatus::Pending,
            content,
            price,
            address_ref,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    /// An order couriers may still race to claim.
    pub fn is_unclaimed(&self) -> bool {
        self.status == OrderStatus::Pending && self.driver_id.is_none()
    }

    /// Move to `status`, stamping `updated_at` and the role-specific
    /// timestamp the target carries (if any).
    pub fn enter_status(&mut self, status: OrderStatus, now: OffsetDateTime) {
        self.status = status;
        self.updated_at = now;
        match status {
            OrderStatus::Accepted => self.accepted_at = Some(now),
            OrderStatus::PickedUp => self.picked_up_at = Some(now),
            OrderStatus::Delivered => self.delivered_at = Some(now),
            OrderStatus::Cancelled => self.cancelled_at = Some(now),
            _ => {}
        }
    }
}
