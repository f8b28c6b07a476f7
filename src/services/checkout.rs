//! Checkout session initiation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::aggregates::{LineItem, Order, ShippingAddress};
use crate::domain::value_objects::Money;
use crate::messaging::EventPublisher;
use crate::payments::{PaymentGateway, SessionLineItem, SessionRequest};
use crate::storage::OrderStore;
use crate::{EcommerceError, Result};

const CHECKOUT_FAILED: &str = "Error creating checkout session";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub cart_items: Vec<LineItem>,
    #[serde(default)]
    pub address: Option<ShippingAddress>,
    #[serde(default)]
    pub total_amount: Decimal,
    pub cart_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStarted {
    pub order_id: Uuid,
    pub url: String,
}

pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    events: EventPublisher,
    currency: String,
    frontend_url: String,
}

impl CheckoutService {
    pub fn new(orders: Arc<dyn OrderStore>, gateway: Arc<dyn PaymentGateway>, events: EventPublisher, config: &AppConfig) -> Self {
        Self { orders, gateway, events, currency: config.stripe.currency.clone(), frontend_url: config.frontend_url.clone() }
    }

    /// Prices every line at its effective unit price in minor units.
    pub fn session_line_items(&self, items: &[LineItem]) -> Result<Vec<SessionLineItem>> {
        items.iter().map(|item| {
            if item.quantity == 0 {
                return Err(EcommerceError::Validation(format!("Invalid quantity for {}", item.title)));
            }
            let unit_amount = Money::new(item.unit_price(), &self.currency).to_minor_units()
                .map_err(|e| EcommerceError::Validation(format!("Invalid price for {}: {e}", item.title)))?;
            Ok(SessionLineItem {
                name: item.title.clone(),
                image: Some(item.image.clone()).filter(|i| i.starts_with("http")),
                unit_amount,
                quantity: item.quantity,
            })
        }).collect()
    }

    #[instrument(skip(self, request), fields(user_id = %user_id, cart_id = %request.cart_id))]
    pub async fn start(&self, user_id: Uuid, request: CheckoutRequest) -> Result<CheckoutStarted> {
        let address = match request.address {
            Some(address) if !request.cart_items.is_empty() => address,
            _ => return Err(EcommerceError::Validation("Invalid request data".into())),
        };
        let line_items = self.session_line_items(&request.cart_items)?;

        let session = self.gateway
            .create_session(SessionRequest {
                line_items,
                currency: self.currency.clone(),
                user_id,
                success_url: format!("{}/account?session_id={{CHECKOUT_SESSION_ID}}", self.frontend_url),
                cancel_url: format!("{}/checkout", self.frontend_url),
            })
            .await
            .map_err(|e| {
                error!(error = %e, "payment gateway refused checkout session");
                EcommerceError::ServiceFailure(CHECKOUT_FAILED)
            })?;

        let mut order = Order::place(user_id, request.cart_id, request.cart_items, address, request.total_amount, session.id.clone())
            .map_err(|e| EcommerceError::Validation(e.to_string()))?;
        if let Err(e) = self.orders.insert_order(&order).await {
            // The hosted session exists but no order references it.
            error!(session_id = %session.id, error = %e, "orphaned checkout session: order not stored");
            return Err(EcommerceError::ServiceFailure(CHECKOUT_FAILED));
        }

        info!(order_id = %order.id, session_id = %session.id, "order placed, awaiting payment");
        self.events.publish_all(order.take_events()).await;
        Ok(CheckoutStarted { order_id: order.id, url: session.url })
    }
}
