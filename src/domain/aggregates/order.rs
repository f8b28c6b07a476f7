//! Order Aggregate
//!
//! Line items and the shipping address are snapshots taken at checkout. They
//! are never re-read from the catalog, so historical prices survive later
//! product edits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub cart_items: Vec<LineItem>,
    pub address: ShippingAddress,
    pub total_amount: Decimal,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Hosted checkout session id issued by the payment gateway.
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub title: String,
    pub image: String,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    pub quantity: u32,
}

impl LineItem {
    pub fn unit_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale > Decimal::ZERO => sale,
            _ => self.price,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub address_id: Option<String>,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub pin_code: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum OrderStatus { #[default] Pending, InProcess, InShipping, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod { #[default] Stripe }

/// Projection returned by order listings.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub total_amount: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn place(
        user_id: Uuid,
        cart_id: Uuid,
        cart_items: Vec<LineItem>,
        address: ShippingAddress,
        total_amount: Decimal,
        payment_id: impl Into<String>,
    ) -> Result<Self, OrderError> {
        if cart_items.is_empty() { return Err(OrderError::NoItems); }
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), user_id, cart_id, cart_items, address, total_amount,
            order_status: OrderStatus::Pending, payment_method: PaymentMethod::Stripe, payment_status: PaymentStatus::Pending,
            payment_id: payment_id.into(), created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: order.id, user_id, total: total_amount }));
        Ok(order)
    }

    pub fn is_paid(&self) -> bool { self.payment_status == PaymentStatus::Paid }
    pub fn contains_product(&self, product_id: Uuid) -> bool { self.cart_items.iter().any(|i| i.product_id == product_id) }

    /// pending/pending → paid/inProcess. Happens once per order.
    pub fn confirm_payment(&mut self) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        self.payment_status = PaymentStatus::Paid;
        self.order_status = OrderStatus::InProcess;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, payment_id: self.payment_id.clone() }));
        Ok(())
    }

    /// Administrative override; any of the five statuses is accepted.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.order_status = status;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status: status.to_string() }));
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id, cart_id: self.cart_id, total_amount: self.total_amount, order_status: self.order_status,
            payment_status: self.payment_status, payment_id: self.payment_id.clone(), created_at: self.created_at,
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Order is already paid")]
    AlreadyPaid,
}

#[cfg(test)]
pub(crate) fn sample_item(product_id: Uuid, price: Decimal, quantity: u32) -> LineItem {
    LineItem { product_id, title: "Widget".into(), image: "https://img.example.com/w.png".into(), price, sale_price: None, quantity }
}
