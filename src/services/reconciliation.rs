//! Payment confirmation.
//!
//! A verified `checkout.session.completed` delivery marks its order paid,
//! decrements stock for every line and deletes the originating cart. The
//! stock check runs against every line before anything changes; the
//! mutations are then applied as one unit of work through the ledger, which
//! also makes redelivered events no-ops.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::{LineItem, OrderError, Product};
use crate::domain::events::DomainEvent;
use crate::messaging::EventPublisher;
use crate::payments::{PaymentEventKind, PaymentGateway};
use crate::storage::{ConfirmationOutcome, OrderStore, PaymentConfirmation, PaymentLedger, ProductStore, StockDecrement};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed { order_id: Uuid },
    /// Event type this service does not act on.
    Ignored { event_type: String },
    /// The session was already applied.
    Duplicate { session_id: String },
}

impl WebhookOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "Order confirmed successfully",
            Self::Ignored { .. } => "Event acknowledged",
            Self::Duplicate { .. } => "Event already processed",
        }
    }
}

pub struct ReconciliationService {
    gateway: Arc<dyn PaymentGateway>,
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn PaymentLedger>,
    events: EventPublisher,
}

impl ReconciliationService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn PaymentLedger>,
        events: EventPublisher,
    ) -> Self {
        Self { gateway, products, orders, ledger, events }
    }

    #[instrument(skip_all, fields(bytes = payload.len()))]
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        let signature = signature.ok_or_else(|| EcommerceError::InvalidSignature("missing Stripe-Signature header".into()))?;
        let event = self.gateway.verify_and_parse_event(payload, signature)?;

        if !event.is_checkout_completed() {
            let event_type = match event.kind {
                PaymentEventKind::Other(kind) => kind,
                PaymentEventKind::CheckoutSessionCompleted => String::new(),
            };
            info!(event_id = %event.id, event_type = %event_type, "event ignored");
            return Ok(WebhookOutcome::Ignored { event_type });
        }

        let session_id = event.session_id
            .ok_or_else(|| EcommerceError::Validation("Event does not reference a checkout session".into()))?;
        if self.ledger.is_session_processed(&session_id).await? {
            info!(session_id = %session_id, "duplicate delivery");
            return Ok(WebhookOutcome::Duplicate { session_id });
        }

        let mut order = self.orders.find_order_by_payment_id(&session_id).await?.ok_or(EcommerceError::OrderNotFound)?;
        match order.confirm_payment() {
            Ok(()) => {}
            Err(OrderError::AlreadyPaid) => {
                info!(session_id = %session_id, order_id = %order.id, "order already paid");
                return Ok(WebhookOutcome::Duplicate { session_id });
            }
            Err(e) => return Err(EcommerceError::Validation(e.to_string())),
        }

        let (decrements, mut events) = self.check_stock(&order.cart_items).await?;
        events.extend(order.take_events());

        let confirmation = PaymentConfirmation {
            event_id: event.id,
            session_id: session_id.clone(),
            cart_id: order.cart_id,
            order,
            decrements,
        };
        let order_id = confirmation.order.id;
        match self.ledger.apply_payment_confirmation(&confirmation).await? {
            ConfirmationOutcome::AlreadyProcessed => {
                info!(session_id = %session_id, "duplicate delivery");
                Ok(WebhookOutcome::Duplicate { session_id })
            }
            ConfirmationOutcome::Applied => {
                info!(order_id = %order_id, session_id = %session_id, lines = confirmation.decrements.len(), "order paid, stock decremented");
                self.events.publish_all(events).await;
                Ok(WebhookOutcome::Confirmed { order_id })
            }
        }
    }

    /// Loads every referenced product concurrently and checks each line
    /// without writing anything. All shortages are reported together.
    async fn check_stock(&self, lines: &[LineItem]) -> Result<(Vec<StockDecrement>, Vec<DomainEvent>)> {
        let loaded = try_join_all(lines.iter().map(|line| self.products.find_product(line.product_id))).await?;
        let mut products: HashMap<Uuid, Product> = loaded.into_iter().flatten().map(|p| (p.id, p)).collect();

        let mut shortages = Vec::new();
        let mut decrements = Vec::new();
        for line in lines {
            match products.get_mut(&line.product_id) {
                None => shortages.push(format!("{} (no longer available)", line.title)),
                Some(product) => match product.remove_inventory(line.quantity) {
                    Ok(()) => decrements.push(StockDecrement { product_id: line.product_id, quantity: line.quantity }),
                    Err(_) => shortages.push(product.title.clone()),
                },
            }
        }
        if !shortages.is_empty() {
            warn!(shortages = ?shortages, "payment confirmation aborted, order stays pending");
            return Err(EcommerceError::InsufficientInventory(format!("Not enough stock for product: {}", shortages.join(", "))));
        }

        let events = products.values_mut().flat_map(|p| p.take_events()).collect();
        Ok((decrements, events))
    }
}
