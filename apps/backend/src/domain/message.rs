use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::actor::ActorId;
use crate::domain::order::OrderId;

pub type MessageId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    System,
}

/// A chat message, append-only. Ordering within an order is established by
/// `sequence`, a monotonic counter owned by the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub order_id: Option<OrderId>,
    pub from_actor_id: ActorId,
    pub to_actor_id: Option<ActorId>,
    pub content: String,
    pub kind: MessageKind,
    pub sequence: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Payload for appending a message; id, sequence and created_at are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub order_id: Option<OrderId>,
    pub from_actor_id: ActorId,
    pub to_actor_id: Option<ActorId>,
    pub content: String,
    pub kind: MessageKind,
}
