use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::{signature, CheckoutSession, PaymentEvent, PaymentGateway, SessionRequest};
use crate::config::StripeConfig;
use crate::{EcommerceError, Result};

/// Stripe Checkout over the REST API.
pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { config, client })
    }

    fn session_form(&self, request: &SessionRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
            ("metadata[userId]".into(), request.user_id.to_string()),
        ];
        for (i, line) in request.line_items.iter().enumerate() {
            let key = |field: &str| format!("line_items[{i}][{field}]");
            params.push((key("price_data][currency"), request.currency.clone()));
            params.push((key("price_data][product_data][name"), line.name.clone()));
            if let Some(image) = &line.image {
                params.push((key("price_data][product_data][images][0"), image.clone()));
            }
            params.push((key("price_data][unit_amount"), line.unit_amount.to_string()));
            params.push((key("quantity"), line.quantity.to_string()));
        }
        params
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(user_id = %request.user_id, lines = request.line_items.len()))]
    async fn create_session(&self, request: SessionRequest) -> Result<CheckoutSession> {
        let response = self.client
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&self.session_form(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %body, "Stripe rejected checkout session");
            return Err(EcommerceError::Payment(format!("Stripe error ({status}): {body}")));
        }

        let session: SessionResponse = response.json().await?;
        let url = session.url.ok_or_else(|| EcommerceError::Payment(format!("session {} has no redirect url", session.id)))?;
        info!(session_id = %session.id, "checkout session created");
        Ok(CheckoutSession { id: session.id, url })
    }

    fn verify_and_parse_event(&self, payload: &[u8], header: &str) -> Result<PaymentEvent> {
        let now = chrono::Utc::now().timestamp();
        signature::verify(header, payload, &self.config.webhook_secret, self.config.webhook_tolerance, now).map_err(|e| {
            warn!(error = %e, "webhook signature rejected");
            EcommerceError::InvalidSignature(e.to_string())
        })?;
        PaymentEvent::parse(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::payments::SessionLineItem;
    use uuid::Uuid;

    fn gateway() -> StripeGateway { StripeGateway::new(AppConfig::for_tests().stripe).unwrap() }

    #[test]
    fn test_session_form_encodes_lines() {
        let request = SessionRequest {
            line_items: vec![SessionLineItem { name: "Tee".into(), image: Some("https://img/t.png".into()), unit_amount: 2000, quantity: 2 }],
            currency: "usd".into(),
            user_id: Uuid::nil(),
            success_url: "http://shop/account?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://shop/checkout".into(),
        };
        let form = gateway().session_form(&request);
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("2000"));
        assert_eq!(get("line_items[0][price_data][product_data][images][0]"), Some("https://img/t.png"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("metadata[userId]"), Some(Uuid::nil().to_string().as_str()));
    }

    #[test]
    fn test_bad_signature_is_rejected() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = signature::sign(body, "whsec_wrong", chrono::Utc::now().timestamp());
        assert!(matches!(gateway().verify_and_parse_event(body, &header), Err(EcommerceError::InvalidSignature(_))));
    }

    #[test]
    fn test_signed_event_is_parsed() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_9"}}}"#;
        let header = signature::sign(body, "whsec_test_secret", chrono::Utc::now().timestamp());
        let event = gateway().verify_and_parse_event(body, &header).unwrap();
        assert_eq!(event.session_id.as_deref(), Some("cs_9"));
    }
}
