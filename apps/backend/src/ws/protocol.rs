use serde::{Deserialize, Serialize};

use crate::domain::{ActorId, Message, Order, OrderId, OrderStatus, Role};
use crate::errors::DomainError;

pub const PROTOCOL_VERSION: i32 = 1;

/// A logical broadcast channel.
///
/// Membership is re-derived from current order state on every join; it is
/// never a stored fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// Scoped to one order; participants and operators only.
    Order(OrderId),
    /// An actor's personal inbox.
    Actor(ActorId),
    /// Courier-facing announcement channel for unclaimed orders.
    Discovery,
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomId::Order(id) => write!(f, "order:{id}"),
            RoomId::Actor(id) => write!(f, "actor:{id}"),
            RoomId::Discovery => f.write_str("discovery"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Hello {
        protocol: i32,
    },
    JoinOrderRoom {
        order_id: OrderId,
    },
    LeaveOrderRoom {
        order_id: OrderId,
    },
    SendMessage {
        order_id: OrderId,
        content: String,
    },
    /// Courier only; relayed to the order room without persistence.
    UpdateLocation {
        order_id: OrderId,
        lat: f64,
        lng: f64,
        status: Option<String>,
    },
    TypingStart {
        order_id: OrderId,
    },
    TypingStop {
        order_id: OrderId,
    },
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    HelloAck {
        protocol: i32,
        actor_id: ActorId,
        role: Role,
    },

    Ack {
        message: &'static str,
    },

    OrderCreated {
        order: Order,
    },

    /// Assignment changed hands; `driver_id = None` re-opens discovery.
    OrderAssigned {
        order_id: OrderId,
        driver_id: Option<ActorId>,
        status: OrderStatus,
    },

    OrderStatusUpdated {
        order: Order,
    },

    /// Operator payload correction without a status change.
    OrderUpdated {
        order: Order,
    },

    MessageReceived {
        message: Message,
    },

    DriverLocationUpdated {
        order_id: OrderId,
        driver_id: ActorId,
        lat: f64,
        lng: f64,
        status: Option<String>,
    },

    UserJoinedOrder {
        order_id: OrderId,
        actor_id: ActorId,
        role: Role,
    },

    UserLeftOrder {
        order_id: OrderId,
        actor_id: ActorId,
        role: Role,
    },

    UserTyping {
        order_id: OrderId,
        actor_id: ActorId,
        typing: bool,
    },

    Error {
        code: ErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadProtocol,
    BadRequest,
    Forbidden,
    NotFound,
    InvalidTransition,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadProtocol => "bad_protocol",
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidTransition => "invalid_transition",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Internal => "internal",
        }
    }
}

impl From<&DomainError> for ErrorCode {
    fn from(err: &DomainError) -> Self {
        match err {
            DomainError::Validation(_) => ErrorCode::BadRequest,
            DomainError::Authorization(_) => ErrorCode::Forbidden,
            DomainError::NotFound(_, _) => ErrorCode::NotFound,
            DomainError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            DomainError::Conflict(_, _) => ErrorCode::Conflict,
            DomainError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl ServerMsg {
    /// The `error` event for a rejected action.
    pub fn error_for(err: &DomainError) -> Self {
        ServerMsg::Error {
            code: ErrorCode::from(err),
            message: err.to_string(),
        }
    }
}
