use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Actor, ActorId, Order, OrderId, OrderStatus, Role};
use crate::errors::{ConflictKind, DomainError};
use crate::services::access::AccessGuard;
use crate::services::orders::{DetailsPatch, NewOrder, OrderCoordinator};
use crate::store::memory::{MemoryMessageStore, MemoryOrderStore};
use crate::store::{OrderChange, OrderStore, Precondition, StoreError};
use crate::ws::hub::PresenceHub;

fn actor(role: Role) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role,
    }
}

fn coordinator() -> (OrderCoordinator, Arc<MemoryOrderStore>) {
    let orders = Arc::new(MemoryOrderStore::new());
    let messages = Arc::new(MemoryMessageStore::new());
    let hub = Arc::new(PresenceHub::new(AccessGuard::new(orders.clone())));
    (
        OrderCoordinator::new(orders.clone(), messages, hub),
        orders,
    )
}

fn new_order(content: &str) -> NewOrder {
    NewOrder {
        content: content.to_string(),
        price: Some("12.50".to_string()),
        address_ref: Some("addr-77".to_string()),
    }
}

#[tokio::test]
async fn create_requires_customer_role() {
    let (coord, _) = coordinator();
    let courier = actor(Role::Courier);

    let err = coord
        .create_order(&courier, new_order("flowers"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
}

#[tokio::test]
async fn create_rejects_blank_content() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);

    let err = coord
        .create_order(&customer, new_order("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn happy_path_claim_and_deliver() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("groceries"))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.driver_id.is_none());

    let order = coord.accept_order(order.id, &courier).await.unwrap();
    assert_eq!(order.status, OrderStatus::Assigned);
    assert_eq!(order.driver_id, Some(courier.id));

    let mut order = order;
    for target in [
        OrderStatus::Accepted,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ] {
        order = coord.update_status(order.id, &courier, target).await.unwrap();
        assert_eq!(order.status, target);
    }
    assert!(order.delivered_at.is_some());
    assert_eq!(order.driver_id, Some(courier.id));
}

#[tokio::test]
async fn second_claim_is_a_conflict() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let first = actor(Role::Courier);
    let second = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &first).await.unwrap();

    let err = coord.accept_order(order.id, &second).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadyAssigned, _)
    ));
}

#[tokio::test]
async fn reject_returns_order_to_pending() {
    let (coord, orders) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();
    let released = coord.reject_order(order.id, &courier).await.unwrap();

    assert_eq!(released.status, OrderStatus::Pending);
    assert!(released.driver_id.is_none());

    // A different courier can now claim it.
    let other = actor(Role::Courier);
    let reclaimed = coord.accept_order(order.id, &other).await.unwrap();
    assert_eq!(reclaimed.driver_id, Some(other.id));
    assert_eq!(
        orders.load(order.id).await.unwrap().driver_id,
        Some(other.id)
    );
}

#[tokio::test]
async fn foreign_courier_cannot_advance_status() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);
    let stranger = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();

    let err = coord
        .update_status(order.id, &stranger, OrderStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
}

/// Store wrapper that, once armed, releases the order and hands it to a
/// rival courier right before the next conditional write goes through.
/// This reopens the window between a caller's load and its write.
struct ReassignBeforeWrite {
    inner: Arc<MemoryOrderStore>,
    rival: ActorId,
    armed: AtomicBool,
}

#[async_trait]
impl OrderStore for ReassignBeforeWrite {
    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        self.inner.insert(order).await
    }

    async fn load(&self, id: OrderId) -> Result<Order, StoreError> {
        self.inner.load(id).await
    }

    async fn update_where(
        &self,
        id: OrderId,
        pre: Precondition,
        change: OrderChange,
    ) -> Result<Order, StoreError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.inner
                .update_where(
                    id,
                    Precondition::status_is(OrderStatus::Assigned),
                    OrderChange::release(),
                )
                .await?;
            self.inner
                .update_where(id, Precondition::claimable(), OrderChange::assign(self.rival))
                .await?;
        }
        self.inner.update_where(id, pre, change).await
    }
}

#[tokio::test]
async fn reassigned_order_rejects_the_stale_courier_write() {
    let store = Arc::new(ReassignBeforeWrite {
        inner: Arc::new(MemoryOrderStore::new()),
        rival: Uuid::new_v4(),
        armed: AtomicBool::new(false),
    });
    let messages = Arc::new(MemoryMessageStore::new());
    let hub = Arc::new(PresenceHub::new(AccessGuard::new(store.clone())));
    let coord = OrderCoordinator::new(store.clone(), messages, hub);

    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();

    // The order is released and claimed by the rival after this courier's
    // authorization check but before its write lands. The status matches
    // what the courier observed, so only the driver gate can catch it.
    store.armed.store(true, Ordering::SeqCst);
    let err = coord
        .update_status(order.id, &courier, OrderStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::StaleState, _)
    ));

    let settled = store.load(order.id).await.unwrap();
    assert_eq!(settled.status, OrderStatus::Assigned);
    assert_eq!(settled.driver_id, Some(store.rival));
}

#[tokio::test]
async fn customer_cancel_keeps_courier_on_record() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();

    let cancelled = coord
        .update_status(order.id, &customer, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.driver_id, Some(courier.id));
    assert!(cancelled.cancelled_at.is_some());
}

#[tokio::test]
async fn customer_cannot_cancel_once_accepted() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();
    coord
        .update_status(order.id, &courier, OrderStatus::Accepted)
        .await
        .unwrap();

    let err = coord
        .update_status(order.id, &customer, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));
}

#[tokio::test]
async fn reactivate_from_cancelled_clears_courier() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();
    coord
        .update_status(order.id, &customer, OrderStatus::Cancelled)
        .await
        .unwrap();

    let revived = coord.reactivate(order.id, &customer).await.unwrap();
    assert_eq!(revived.status, OrderStatus::Pending);
    assert!(revived.driver_id.is_none());
}

#[tokio::test]
async fn reactivate_from_delivered_keeps_courier_on_record() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);
    let operator = actor(Role::Operator);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();
    for target in [
        OrderStatus::Accepted,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ] {
        coord.update_status(order.id, &courier, target).await.unwrap();
    }

    let revived = coord.reactivate(order.id, &operator).await.unwrap();
    assert_eq!(revived.status, OrderStatus::Pending);
    assert_eq!(revived.driver_id, Some(courier.id));
}

#[tokio::test]
async fn reactivate_rejects_active_orders() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let operator = actor(Role::Operator);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();

    let err = coord.reactivate(order.id, &operator).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));
}

#[tokio::test]
async fn details_patch_is_operator_only() {
    let (coord, orders) = coordinator();
    let customer = actor(Role::Customer);
    let operator = actor(Role::Operator);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();

    let err = coord
        .update_details(
            order.id,
            &customer,
            DetailsPatch {
                price: Some("99.00".to_string()),
                ..DetailsPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    let patched = coord
        .update_details(
            order.id,
            &operator,
            DetailsPatch {
                price: Some("99.00".to_string()),
                ..DetailsPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.price.as_deref(), Some("99.00"));
    assert_eq!(patched.status, OrderStatus::Pending);
    assert_eq!(
        orders.load(order.id).await.unwrap().price.as_deref(),
        Some("99.00")
    );
}

#[tokio::test]
async fn messages_are_sequenced_per_order() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();

    let first = coord
        .send_message(order.id, &customer, "ring the bell".to_string())
        .await
        .unwrap();
    let second = coord
        .send_message(order.id, &courier, "will do".to_string())
        .await
        .unwrap();

    assert!(first.sequence < second.sequence);
    assert_eq!(first.to_actor_id, Some(courier.id));
    assert_eq!(second.to_actor_id, Some(customer.id));
}

#[tokio::test]
async fn outsider_cannot_message_or_observe() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let outsider = actor(Role::Customer);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();

    let err = coord
        .send_message(order.id, &outsider, "hi".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    let err = coord.get_order(order.id, &outsider).await.unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
}

#[tokio::test]
async fn location_updates_require_the_bound_courier() {
    let (coord, _) = coordinator();
    let customer = actor(Role::Customer);
    let courier = actor(Role::Courier);
    let stranger = actor(Role::Courier);

    let order = coord
        .create_order(&customer, new_order("parcel"))
        .await
        .unwrap();
    coord.accept_order(order.id, &courier).await.unwrap();

    coord
        .share_location(order.id, &courier, 52.52, 13.405, Some("in_transit".into()))
        .await
        .unwrap();

    let err = coord
        .share_location(order.id, &stranger, 0.0, 0.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
}
