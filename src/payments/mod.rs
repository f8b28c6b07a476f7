//! Hosted-checkout payment gateway port.

pub mod signature;
mod stripe;

pub use stripe::StripeGateway;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::{EcommerceError, Result};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// One priced line on the hosted payment page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub image: Option<String>,
    /// Price per unit in minor currency units.
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub currency: String,
    pub user_id: Uuid,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentEventKind {
    CheckoutSessionCompleted,
    Other(String),
}

/// A verified gateway notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentEvent {
    pub id: String,
    pub kind: PaymentEventKind,
    /// Id of the checkout session the event refers to, when it refers to one.
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Deserialize)]
struct RawData { object: RawObject }

#[derive(Deserialize)]
struct RawObject { #[serde(default)] id: Option<String> }

impl PaymentEvent {
    /// Parses an already-authenticated event body.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| EcommerceError::Validation(format!("Malformed webhook payload: {e}")))?;
        let kind = match raw.kind.as_str() {
            CHECKOUT_SESSION_COMPLETED => PaymentEventKind::CheckoutSessionCompleted,
            other => PaymentEventKind::Other(other.to_string()),
        };
        Ok(Self { id: raw.id, kind, session_id: raw.data.and_then(|d| d.object.id) })
    }

    pub fn is_checkout_completed(&self) -> bool { self.kind == PaymentEventKind::CheckoutSessionCompleted }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout session for the given lines.
    async fn create_session(&self, request: SessionRequest) -> Result<CheckoutSession>;

    /// Authenticates a webhook delivery and decodes it. Fails with
    /// `InvalidSignature` before anything in the body is trusted.
    fn verify_and_parse_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completed_event() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","object":"checkout.session"}}}"#;
        let event = PaymentEvent::parse(body).unwrap();
        assert!(event.is_checkout_completed());
        assert_eq!(event.session_id.as_deref(), Some("cs_1"));
    }

    #[test]
    fn test_parse_other_event() {
        let event = PaymentEvent::parse(br#"{"id":"evt_2","type":"charge.refunded"}"#).unwrap();
        assert_eq!(event.kind, PaymentEventKind::Other("charge.refunded".into()));
        assert_eq!(event.session_id, None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(PaymentEvent::parse(b"not json"), Err(EcommerceError::Validation(_))));
    }
}
