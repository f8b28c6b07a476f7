#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tower::ServiceExt;

use storefront::api::{self, AppState, SIGNATURE_HEADER};
use storefront::config::AppConfig;
use storefront::domain::aggregates::{NewProduct, Product, User};
use storefront::domain::value_objects::{Brand, Category, Role};
use storefront::media::InlineImageHost;
use storefront::messaging::EventPublisher;
use storefront::payments::{signature, CheckoutSession, PaymentEvent, PaymentGateway, SessionRequest};
use storefront::services::auth::hash_password;
use storefront::storage::{MemoryStore, ProductStore, Stores, UserStore};
use storefront::{EcommerceError, Result};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Gateway double: numbered sessions, real signature checks.
#[derive(Default)]
pub struct FakeGateway {
    pub sessions: AtomicUsize,
    pub verifications: AtomicUsize,
    pub requests: Mutex<Vec<SessionRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(&self, request: SessionRequest) -> Result<CheckoutSession> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Ok(CheckoutSession { id: format!("cs_test_{n}"), url: format!("https://checkout.test/pay/cs_test_{n}") })
    }

    fn verify_and_parse_event(&self, payload: &[u8], sig: &str) -> Result<PaymentEvent> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now().timestamp();
        signature::verify(sig, payload, WEBHOOK_SECRET, Duration::from_secs(300), now)
            .map_err(|e| EcommerceError::InvalidSignature(e.to_string()))?;
        PaymentEvent::parse(payload)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let state = AppState::new(
            AppConfig::for_tests(),
            Stores::from_backend(store.clone()),
            gateway.clone(),
            Arc::new(InlineImageHost),
            EventPublisher::disabled(),
        );
        Self { router: api::router(state.clone()), state, store, gateway }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Stores a user directly and returns a bearer token for it.
    pub async fn seed_user(&self, username: &str, role: Role) -> (User, String) {
        let mut user = User::register(username, &format!("{username}@example.com"), hash_password("secret123").unwrap());
        user.role = role;
        self.store.insert_user(&user).await.unwrap();
        let token = self.state.auth.issue(&user).unwrap();
        (user, token)
    }

    pub async fn seed_product(&self, title: &str, price: Decimal, sale_price: Option<Decimal>, stock: u32) -> Product {
        let product = Product::create(NewProduct {
            title: title.into(),
            description: format!("{title} description"),
            price,
            sale_price,
            brand: Brand::Nike,
            category: Category::Men,
            image: "https://img.test/p.png".into(),
            total_stock: stock,
        })
        .unwrap();
        self.store.insert_product(&product).await.unwrap();
        product
    }

    pub async fn stock_of(&self, product_id: uuid::Uuid) -> u32 {
        self.store.find_product(product_id).await.unwrap().unwrap().total_stock.value()
    }

    /// Delivers a webhook body signed with the test secret.
    pub async fn deliver(&self, payload: &Value) -> (StatusCode, Value) {
        let body = payload.to_string();
        let sig = signature::sign(body.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        self.deliver_raw(body, Some(sig)).await
    }

    pub async fn deliver_raw(&self, body: String, sig: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/shop/order/checkout/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(sig) = sig {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}

pub fn completed_event(event_id: &str, session_id: &str) -> Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id, "object": "checkout.session" } }
    })
}

pub fn address() -> Value {
    serde_json::json!({ "addressId": "addr-1", "address": "1 Main St", "city": "Springfield", "phone": "01234567890", "pinCode": "12345" })
}

pub fn line(product: &Product, quantity: u32) -> Value {
    serde_json::json!({
        "productId": product.id,
        "title": product.title,
        "image": product.image,
        "price": product.price,
        "salePrice": product.sale_price,
        "quantity": quantity
    })
}
