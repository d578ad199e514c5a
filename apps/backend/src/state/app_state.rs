use std::sync::Arc;

use crate::services::access::AccessGuard;
use crate::services::orders::OrderCoordinator;
use crate::store::memory::{MemoryMessageStore, MemoryOrderStore};
use crate::store::{MessageStore, OrderStore};
use crate::ws::hub::PresenceHub;

use super::security_config::SecurityConfig;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Security configuration including JWT settings
    pub security: SecurityConfig,
    coordinator: Arc<OrderCoordinator>,
    hub: Arc<PresenceHub>,
}

impl AppState {
    /// Wire the coordinator and hub over the given stores. The hub's
    /// access guard and the coordinator share the same order store, so
    /// room authorization always sees the latest writes.
    pub fn new(
        orders: Arc<dyn OrderStore>,
        messages: Arc<dyn MessageStore>,
        security: SecurityConfig,
    ) -> Self {
        let hub = Arc::new(PresenceHub::new(AccessGuard::new(orders.clone())));
        let coordinator = Arc::new(OrderCoordinator::new(orders, messages, hub.clone()));
        Self {
            security,
            coordinator,
            hub,
        }
    }

    /// State backed by the in-process stores.
    pub fn in_memory(security: SecurityConfig) -> Self {
        Self::new(
            Arc::new(MemoryOrderStore::new()),
            Arc::new(MemoryMessageStore::new()),
            security,
        )
    }

    pub fn coordinator(&self) -> Arc<OrderCoordinator> {
        self.coordinator.clone()
    }

    pub fn hub(&self) -> Arc<PresenceHub> {
        self.hub.clone()
    }

    pub fn for_tests() -> Self {
        Self::in_memory(SecurityConfig::default())
    }
}
