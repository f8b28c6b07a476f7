//! HTTP surface: shared state, route table and middleware.

pub mod extract;
pub mod response;

mod account;
mod admin;
mod auth;
mod feature;
mod orders;
mod shop;

pub use orders::SIGNATURE_HEADER;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::config::AppConfig;
use crate::media::ImageHost;
use crate::messaging::EventPublisher;
use crate::payments::PaymentGateway;
use crate::services::{
    AddressService, AuthService, CartService, CatalogService, CheckoutService, FeatureService, OrderService,
    ReconciliationService, ReviewService,
};
use crate::storage::Stores;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub orders: Arc<OrderService>,
    pub reviews: Arc<ReviewService>,
    pub addresses: Arc<AddressService>,
    pub features: Arc<FeatureService>,
    pub images: Arc<dyn ImageHost>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        images: Arc<dyn ImageHost>,
        events: EventPublisher,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(stores.users.clone(), &config)),
            catalog: Arc::new(CatalogService::new(stores.products.clone(), events.clone())),
            cart: Arc::new(CartService::new(stores.carts.clone(), stores.products.clone())),
            checkout: Arc::new(CheckoutService::new(stores.orders.clone(), gateway.clone(), events.clone(), &config)),
            reconciliation: Arc::new(ReconciliationService::new(
                gateway,
                stores.products.clone(),
                stores.orders.clone(),
                stores.ledger.clone(),
                events.clone(),
            )),
            orders: Arc::new(OrderService::new(stores.orders.clone(), events.clone())),
            reviews: Arc::new(ReviewService::new(stores.reviews, stores.orders, stores.products, events)),
            addresses: Arc::new(AddressService::new(stores.addresses)),
            features: Arc::new(FeatureService::new(stores.features)),
            images,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .nest("/api/auth", auth::routes())
        .nest("/api/shop", shop::routes().nest("/order", orders::routes()))
        .nest("/api/account", account::routes())
        .nest("/api/admin", admin::routes())
        .nest("/api/feature", feature::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::CACHE_CONTROL, header::EXPIRES, header::PRAGMA])
        .allow_credentials(true)
}
