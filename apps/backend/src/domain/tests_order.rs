#![cfg(test)]

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus};

fn sample_order(now: OffsetDateTime) -> Order {
    Order::new(
        Uuid::new_v4(),
        "two boxes".to_string(),
        Some("12.50".to_string()),
        Some("addr-1".to_string()),
        now,
    )
}

#[test]
fn new_order_starts_pending_and_unclaimed() {
    let now = OffsetDateTime::now_utc();
    let order = sample_order(now);

    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.driver_id.is_none());
    assert!(order.is_unclaimed());
    assert_eq!(order.created_at, now);
    assert_eq!(order.updated_at, now);
    assert!(order.accepted_at.is_none());
    assert!(order.delivered_at.is_none());
}

#[test]
fn enter_status_stamps_matching_timestamp() {
    let created = OffsetDateTime::now_utc();
    let mut order = sample_order(created);
    let later = created + time::Duration::seconds(30);

    order.driver_id = Some(Uuid::new_v4());
    order.enter_status(OrderStatus::Accepted, later);
    assert_eq!(order.status, OrderStatus::Accepted);
    assert_eq!(order.accepted_at, Some(later));
    assert_eq!(order.updated_at, later);
    // Other timestamps remain untouched.
    assert!(order.picked_up_at.is_none());
    assert!(order.delivered_at.is_none());
    assert!(order.cancelled_at.is_none());

    let later2 = later + time::Duration::seconds(30);
    order.enter_status(OrderStatus::PickedUp, later2);
    assert_eq!(order.picked_up_at, Some(later2));
    assert_eq!(order.accepted_at, Some(later));

    let later3 = later2 + time::Duration::seconds(30);
    order.enter_status(OrderStatus::Delivered, later3);
    assert_eq!(order.delivered_at, Some(later3));
    assert_eq!(order.updated_at, later3);
}

#[test]
fn assigned_order_is_not_unclaimed() {
    let now = OffsetDateTime::now_utc();
    let mut order = sample_order(now);
    order.driver_id = Some(Uuid::new_v4());
    assert!(!order.is_unclaimed());

    order.driver_id = None;
    order.status = OrderStatus::Cancelled;
    assert!(!order.is_unclaimed());
}

#[test]
fn driver_bound_statuses() {
    assert!(!OrderStatus::Pending.requires_driver());
    assert!(OrderStatus::Assigned.requires_driver());
    assert!(OrderStatus::Accepted.requires_driver());
    assert!(OrderStatus::PickedUp.requires_driver());
    assert!(OrderStatus::InTransit.requires_driver());
    assert!(OrderStatus::Delivered.requires_driver());
    assert!(!OrderStatus::Cancelled.requires_driver());
    assert!(!OrderStatus::Failed.requires_driver());
}

#[test]
fn order_round_trips_through_json() {
    let now = OffsetDateTime::now_utc();
    let mut order = sample_order(now);
    order.enter_status(OrderStatus::Cancelled, now);

    let encoded = serde_json::to_string(&order).unwrap();
    let decoded: Order = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.id, order.id);
    assert_eq!(decoded.status, OrderStatus::Cancelled);
    assert!(encoded.contains("\"status\":\"cancelled\""));
}
