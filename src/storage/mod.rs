//! Persistence ports.
//!
//! Every entity gets its own store trait so services only see what they use.
//! [`PgStore`] backs production; [`MemoryStore`] runs without a database and
//! backs the test suite.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Address, AddressFields, Cart, FeatureImage, Order, OrderStatus, OrderSummary, Product, Review, User};
use crate::domain::value_objects::{Brand, Category, SearchKeyword, SortOrder};
use crate::Result;

/// Filtered catalog page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
    pub sort: SortOrder,
    pub offset: u64,
    pub limit: u64,
}

impl ProductQuery {
    pub fn matches(&self, p: &Product) -> bool {
        (self.categories.is_empty() || self.categories.contains(&p.category))
            && (self.brands.is_empty() || self.brands.contains(&p.brand))
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn save_product(&self, product: &Product) -> Result<()>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> Result<bool>;
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;
    async fn count_products(&self, query: &ProductQuery) -> Result<u64>;
    /// Case-insensitive substring match over title, brand, category and description.
    async fn search_products(&self, keyword: &SearchKeyword, limit: u32) -> Result<Vec<Product>>;
    async fn all_products(&self) -> Result<Vec<Product>>;
    async fn set_average_rate(&self, id: Uuid, average: f64) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart_by_user(&self, user_id: Uuid) -> Result<Option<Cart>>;
    /// Inserts or replaces the user's cart.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<()>;
    /// Changes only the fulfilment status, leaving payment state as stored.
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>>;
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>>;
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>>;
    async fn all_orders(&self) -> Result<Vec<OrderSummary>>;
    async fn has_paid_order_with_product(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with `AlreadyReviewed` when (user, product) already has a review.
    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn find_review(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>>;
    async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>>;
    /// Mean over every stored review of the product.
    async fn average_rate(&self, product_id: Uuid) -> Result<Option<f64>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Case-insensitive on both fields.
    async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn insert_address(&self, address: &Address) -> Result<()>;
    async fn addresses_for_user(&self, user_id: Uuid) -> Result<Vec<Address>>;
    async fn update_address(&self, user_id: Uuid, id: Uuid, fields: AddressFields) -> Result<Option<Address>>;
    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>>;
}

#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn insert_feature(&self, feature: &FeatureImage) -> Result<()>;
    async fn features(&self) -> Result<Vec<FeatureImage>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Everything a verified payment completion changes, applied as one unit.
#[derive(Clone, Debug)]
pub struct PaymentConfirmation {
    pub event_id: String,
    pub session_id: String,
    /// The order with its paid/inProcess transition already applied.
    pub order: Order,
    pub decrements: Vec<StockDecrement>,
    pub cart_id: Uuid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Applied,
    /// The session was already recorded in the ledger; nothing changed.
    AlreadyProcessed,
}

#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn is_session_processed(&self, session_id: &str) -> Result<bool>;
    /// Records the session in the idempotency ledger, decrements stock,
    /// saves the order and deletes the cart. Either all of it happens or
    /// none of it does; a stock shortfall fails with `InsufficientInventory`.
    async fn apply_payment_confirmation(&self, confirmation: &PaymentConfirmation) -> Result<ConfirmationOutcome>;
}

/// Bundle of store handles shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub users: Arc<dyn UserStore>,
    pub addresses: Arc<dyn AddressStore>,
    pub features: Arc<dyn FeatureStore>,
    pub ledger: Arc<dyn PaymentLedger>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ProductStore + CartStore + OrderStore + ReviewStore + UserStore + AddressStore + FeatureStore + PaymentLedger + 'static,
    {
        Self {
            products: backend.clone(),
            carts: backend.clone(),
            orders: backend.clone(),
            reviews: backend.clone(),
            users: backend.clone(),
            addresses: backend.clone(),
            features: backend.clone(),
            ledger: backend,
        }
    }
}
