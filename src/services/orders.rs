//! Order history for customers and order administration.

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus, OrderSummary};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::messaging::EventPublisher;
use crate::storage::OrderStore;
use crate::{EcommerceError, Result};

pub const ALLOWED_STATUSES: [&str; 5] = ["pending", "inProcess", "inShipping", "delivered", "cancelled"];

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>, events: EventPublisher) -> Self { Self { orders, events } }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>> {
        let orders = self.orders.orders_for_user(user_id).await?;
        if orders.is_empty() { return Err(EcommerceError::NotFound("No orders found".into())); }
        Ok(orders)
    }

    /// Another user's order is reported exactly like a missing one.
    pub async fn detail_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.orders.find_order(order_id).await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| EcommerceError::NotFound("No order found".into()))
    }

    pub async fn list_all(&self) -> Result<Vec<OrderSummary>> {
        let orders = self.orders.all_orders().await?;
        if orders.is_empty() { return Err(EcommerceError::NotFound("No orders found".into())); }
        Ok(orders)
    }

    pub async fn detail(&self, order_id: Uuid) -> Result<Order> {
        self.orders.find_order(order_id).await?.ok_or_else(|| EcommerceError::NotFound("No order found".into()))
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: Uuid, status: Option<&str>) -> Result<Order> {
        let status: OrderStatus = status.and_then(|s| s.parse().ok()).ok_or_else(|| {
            EcommerceError::Validation(format!("Invalid order status. Allowed: {}", ALLOWED_STATUSES.join(", ")))
        })?;
        let order = self.orders.set_order_status(order_id, status).await?
            .ok_or_else(|| EcommerceError::NotFound("No order found with the provided ID".into()))?;
        info!(order_id = %order.id, status = %status, "order status updated");
        self.events.publish(&DomainEvent::Order(OrderEvent::StatusChanged { order_id, status: status.to_string() })).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::sample_item;
    use crate::domain::aggregates::ShippingAddress;
    use crate::domain::aggregates::PaymentStatus;
    use crate::storage::{MemoryStore, PaymentConfirmation, PaymentLedger};
    use rust_decimal::Decimal;

    async fn setup() -> (OrderService, Order) {
        let (svc, _, order) = setup_with_store().await;
        (svc, order)
    }

    async fn setup_with_store() -> (OrderService, Arc<MemoryStore>, Order) {
        let store = Arc::new(MemoryStore::new());
        let item = sample_item(Uuid::new_v4(), Decimal::new(10, 0), 1);
        let order = Order::place(Uuid::new_v4(), Uuid::new_v4(), vec![item], ShippingAddress::default(), Decimal::new(10, 0), "cs_o").unwrap();
        store.insert_order(&order).await.unwrap();
        (OrderService::new(store.clone(), EventPublisher::disabled()), store, order)
    }

    #[tokio::test]
    async fn test_detail_is_scoped_to_owner() {
        let (svc, order) = setup().await;
        assert_eq!(svc.detail_for_user(order.user_id, order.id).await.unwrap().id, order.id);
        assert!(matches!(svc.detail_for_user(Uuid::new_v4(), order.id).await, Err(EcommerceError::NotFound(_))));
        assert!(matches!(svc.list_for_user(Uuid::new_v4()).await, Err(EcommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status() {
        let (svc, order) = setup().await;
        let updated = svc.update_status(order.id, Some("inShipping")).await.unwrap();
        assert_eq!(updated.order_status, OrderStatus::InShipping);
        assert!(matches!(svc.update_status(order.id, Some("shipped")).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(svc.update_status(order.id, None).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(svc.update_status(Uuid::new_v4(), Some("delivered")).await, Err(EcommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_update_after_payment_keeps_it_paid() {
        let (svc, store, order) = setup_with_store().await;
        let mut paid = order.clone();
        paid.confirm_payment().unwrap();
        let confirmation = PaymentConfirmation {
            event_id: "evt_o".into(), session_id: order.payment_id.clone(), order: paid,
            decrements: vec![], cart_id: order.cart_id,
        };
        store.apply_payment_confirmation(&confirmation).await.unwrap();

        let updated = svc.update_status(order.id, Some("delivered")).await.unwrap();
        assert_eq!(updated.order_status, OrderStatus::Delivered);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert!(svc.detail(order.id).await.unwrap().is_paid());
    }
}
