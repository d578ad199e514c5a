//! Live connection registry, room membership graph and fan-out.
//!
//! Every connection owns a bounded outbound queue; broadcast is
//! fire-and-forget `try_send` into those queues, never blocking the
//! caller. Membership is snapshotted before delivery so connection
//! teardown can run concurrently with an in-flight broadcast. A full
//! queue marks a stalled consumer: the event is dropped and the
//! connection is torn down rather than queueing indefinitely.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Actor, Role};
use crate::errors::{DomainError, NotFoundKind};
use crate::services::access::AccessGuard;
use crate::ws::protocol::{RoomId, ServerMsg};

pub type ConnectionId = Uuid;

/// Outbound queue depth per connection.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

struct ConnectionEntry {
    actor: Actor,
    rooms: Mutex<HashSet<RoomId>>,
}

pub struct PresenceHub {
    guard: AccessGuard,
    connections: DashMap<ConnectionId, Arc<ConnectionEntry>>,
    rooms: DashMap<RoomId, DashMap<ConnectionId, mpsc::Sender<ServerMsg>>>,
    senders: DashMap<ConnectionId, mpsc::Sender<ServerMsg>>,
}

impl PresenceHub {
    pub fn new(guard: AccessGuard) -> Self {
        Self {
            guard,
            connections: DashMap::new(),
            rooms: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// Register a live connection and hand back its outbound queue.
    ///
    /// The connection is auto-joined to its personal room and, for
    /// couriers and operators, to the discovery channel.
    pub fn connect(&self, actor: Actor) -> (ConnectionId, mpsc::Receiver<ServerMsg>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        let entry = Arc::new(ConnectionEntry {
            actor,
            rooms: Mutex::new(HashSet::new()),
        });
        self.connections.insert(conn_id, entry);
        self.senders.insert(conn_id, tx.clone());

        self.add_membership(conn_id, RoomId::Actor(actor.id), tx.clone());
        if matches!(actor.role, Role::Courier | Role::Operator) {
            self.add_membership(conn_id, RoomId::Discovery, tx);
        }

        debug!(conn_id = %conn_id, actor_id = %actor.id, role = %actor.role, "connection registered");
        (conn_id, rx)
    }

    /// Join a room, re-deriving authorization from current order state.
    /// Existing order-room members are told about the join; the event is
    /// advisory, not a security signal.
    pub async fn join_room(&self, conn_id: ConnectionId, room: RoomId) -> Result<(), DomainError> {
        let (actor, sender) = self.lookup(conn_id)?;

        self.guard.authorize_room(&actor, room).await?;

        // Idempotent: a second join of the same room is a no-op.
        {
            let entry = self.connection(conn_id)?;
            if entry.rooms.lock().contains(&room) {
                return Ok(());
            }
        }

        if let RoomId::Order(order_id) = room {
            self.broadcast(
                room,
                ServerMsg::UserJoinedOrder {
                    order_id,
                    actor_id: actor.id,
                    role: actor.role,
                },
            );
        }

        // Re-check liveness: the connection may have disconnected while
        // authorization was re-derived.
        if !self.connections.contains_key(&conn_id) {
            return Err(DomainError::not_found(
                NotFoundKind::Connection,
                format!("connection {conn_id} is gone"),
            ));
        }
        self.add_membership(conn_id, room, sender);
        Ok(())
    }

    /// Idempotent removal; remaining order-room members are notified.
    pub fn leave_room(&self, conn_id: ConnectionId, room: RoomId) {
        let Some(entry) = self.connections.get(&conn_id).map(|e| e.value().clone()) else {
            return;
        };

        let was_member = entry.rooms.lock().remove(&room);
        if !was_member {
            return;
        }
        self.remove_membership(conn_id, room);

        if let RoomId::Order(order_id) = room {
            self.broadcast(
                room,
                ServerMsg::UserLeftOrder {
                    order_id,
                    actor_id: entry.actor.id,
                    role: entry.actor.role,
                },
            );
        }
    }

    /// Deliver `msg` to every connection currently joined to `room`.
    ///
    /// At-most-once per connection per call; delivery order per room is
    /// the order in which callers issued broadcasts. Stalled or closed
    /// consumers are torn down.
    pub fn broadcast(&self, room: RoomId, msg: ServerMsg) {
        let members: Vec<(ConnectionId, mpsc::Sender<ServerMsg>)> = match self.rooms.get(&room) {
            Some(entry) => entry
                .iter()
                .map(|member| (*member.key(), member.value().clone()))
                .collect(),
            None => return,
        };

        for (conn_id, sender) in members {
            match sender.try_send(msg.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(conn_id = %conn_id, room = %room, "outbound queue full, dropping connection");
                    // Drop this room's membership directly in case teardown
                    // already ran and left it behind.
                    self.remove_membership(conn_id, room);
                    self.disconnect(conn_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.remove_membership(conn_id, room);
                    self.disconnect(conn_id);
                }
            }
        }
    }

    /// Tear a connection down, leaving every held room with exactly one
    /// peer notification per room. Idempotent; once removed, no further
    /// broadcast can observe the connection.
    pub fn disconnect(&self, conn_id: ConnectionId) {
        let Some((_, entry)) = self.connections.remove(&conn_id) else {
            return;
        };
        self.senders.remove(&conn_id);

        let held: Vec<RoomId> = entry.rooms.lock().drain().collect();
        for room in held {
            self.remove_membership(conn_id, room);
            if let RoomId::Order(order_id) = room {
                self.broadcast(
                    room,
                    ServerMsg::UserLeftOrder {
                        order_id,
                        actor_id: entry.actor.id,
                        role: entry.actor.role,
                    },
                );
            }
        }

        debug!(conn_id = %conn_id, actor_id = %entry.actor.id, "connection removed");
    }

    pub fn is_member(&self, conn_id: ConnectionId, room: RoomId) -> bool {
        self.rooms
            .get(&room)
            .map(|entry| entry.contains_key(&conn_id))
            .unwrap_or(false)
    }

    pub fn room_size(&self, room: RoomId) -> usize {
        self.rooms.get(&room).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn connection(&self, conn_id: ConnectionId) -> Result<Arc<ConnectionEntry>, DomainError> {
        self.connections
            .get(&conn_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Connection,
                    format!("connection {conn_id} is gone"),
                )
            })
    }

    fn lookup(
        &self,
        conn_id: ConnectionId,
    ) -> Result<(Actor, mpsc::Sender<ServerMsg>), DomainError> {
        let entry = self.connection(conn_id)?;
        let sender = self
            .senders
            .get(&conn_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Connection,
                    format!("connection {conn_id} is gone"),
                )
            })?;
        Ok((entry.actor, sender))
    }

    fn add_membership(&self, conn_id: ConnectionId, room: RoomId, sender: mpsc::Sender<ServerMsg>) {
        if let Some(entry) = self.connections.get(&conn_id) {
            entry.rooms.lock().insert(room);
        }
        self.rooms
            .entry(room)
            .or_default()
            .insert(conn_id, sender);
    }

    fn remove_membership(&self, conn_id: ConnectionId, room: RoomId) {
        if let Some(entry) = self.rooms.get(&room) {
            entry.remove(&conn_id);
            if entry.is_empty() {
                drop(entry);
                self.rooms.remove_if(&room, |_, members| members.is_empty());
            }
        }
    }
}
