//! In-memory store adapters.
//!
//! Default wiring for the server and the test suites. Each order record is
//! guarded by its own async mutex, so every write goes through a
//! per-order critical section; lock acquisition is bounded and a timeout
//! surfaces as `StoreError::Busy`, which callers treat as a lost race.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::domain::{Message, NewMessage, Order, OrderId};
use crate::store::{MessageStore, OrderChange, OrderStore, Precondition, StoreError};

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<OrderId, Arc<Mutex<Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: OrderId) -> Result<Arc<Mutex<Order>>, StoreError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        let id = order.id;
        match self.orders.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Unavailable(format!(
                "order {id} already exists"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(order.clone())));
                Ok(order)
            }
        }
    }

    async fn load(&self, id: OrderId) -> Result<Order, StoreError> {
        let entry = self.entry(id)?;
        let guard = timeout(LOCK_TIMEOUT, entry.lock())
            .await
            .map_err(|_| StoreError::Busy(id))?;
        Ok(guard.clone())
    }

    async fn update_where(
        &self,
        id: OrderId,
        pre: Precondition,
        change: OrderChange,
    ) -> Result<Order, StoreError> {
        let entry = self.entry(id)?;
        let mut guard = timeout(LOCK_TIMEOUT, entry.lock())
            .await
            .map_err(|_| StoreError::Busy(id))?;

        if !pre.holds(&guard) {
            return Err(StoreError::PreconditionFailed {
                current: Box::new(guard.clone()),
            });
        }

        change.apply(&mut guard, OffsetDateTime::now_utc());
        Ok(guard.clone())
    }
}

struct OrderThread {
    next_sequence: u64,
    messages: Vec<Message>,
}

impl OrderThread {
    fn new() -> Self {
        Self {
            next_sequence: 1,
            messages: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    threads: DashMap<OrderId, Arc<Mutex<OrderThread>>>,
    /// Sequence source for messages outside any order thread.
    unscoped_sequence: AtomicU64,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages appended for an order, in sequence order. Test/debug aid;
    /// not part of the `MessageStore` contract.
    pub async fn history(&self, order_id: OrderId) -> Vec<Message> {
        match self.threads.get(&order_id) {
            Some(entry) => entry.value().clone().lock().await.messages.clone(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, message: NewMessage) -> Result<Message, StoreError> {
        let created_at = OffsetDateTime::now_utc();

        let sequence = match message.order_id {
            Some(order_id) => {
                let thread = self
                    .threads
                    .entry(order_id)
                    .or_insert_with(|| Arc::new(Mutex::new(OrderThread::new())))
                    .value()
                    .clone();
                let mut guard = thread.lock().await;
                let sequence = guard.next_sequence;
                guard.next_sequence += 1;

                let stored = Message {
                    id: Uuid::new_v4(),
                    order_id: message.order_id,
                    from_actor_id: message.from_actor_id,
                    to_actor_id: message.to_actor_id,
                    content: message.content,
                    kind: message.kind,
                    sequence,
                    created_at,
                };
                guard.messages.push(stored.clone());
                return Ok(stored);
            }
            None => self.unscoped_sequence.fetch_add(1, Ordering::SeqCst) + 1,
        };

        Ok(Message {
            id: Uuid::new_v4(),
            order_id: None,
            from_actor_id: message.from_actor_id,
            to_actor_id: message.to_actor_id,
            content: message.content,
            kind: message.kind,
            sequence,
            created_at,
        })
    }
}
