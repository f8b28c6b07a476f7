//! In-process store used when no database is configured, and by tests.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::*;
use crate::EcommerceError;

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    reviews: Vec<Review>,
    users: HashMap<Uuid, User>,
    addresses: HashMap<Uuid, Address>,
    features: Vec<FeatureImage>,
    processed_sessions: HashSet<String>,
}

/// Process-local store. All collections live behind one lock, so every
/// trait method observes and mutates a consistent snapshot.
#[derive(Default)]
pub struct MemoryStore { state: RwLock<State> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn compare(sort: SortOrder, a: &Product, b: &Product) -> Ordering {
    let primary = match sort {
        SortOrder::PriceAsc => a.price.cmp(&b.price),
        SortOrder::PriceDesc => b.price.cmp(&a.price),
        SortOrder::TitleAsc => a.title.cmp(&b.title),
        SortOrder::TitleDesc => b.title.cmp(&a.title),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut product = product.clone();
        product.events.clear();
        self.state.write().await.products.insert(product.id, product);
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> Result<()> { self.insert_product(product).await }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.products.remove(&id).is_some())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut found: Vec<Product> = state.products.values().filter(|p| query.matches(p)).cloned().collect();
        found.sort_by(|a, b| compare(query.sort, a, b));
        Ok(found.into_iter().skip(query.offset as usize).take(query.limit as usize).collect())
    }

    async fn count_products(&self, query: &ProductQuery) -> Result<u64> {
        Ok(self.state.read().await.products.values().filter(|p| query.matches(p)).count() as u64)
    }

    async fn search_products(&self, keyword: &SearchKeyword, limit: u32) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut found: Vec<Product> = state.products.values()
            .filter(|p| {
                keyword.matches(&p.title) || keyword.matches(p.brand.as_ref())
                    || keyword.matches(p.category.as_ref()) || keyword.matches(&p.description)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| compare(SortOrder::TitleAsc, a, b));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        let mut all: Vec<Product> = self.state.read().await.products.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn set_average_rate(&self, id: Uuid, average: f64) -> Result<()> {
        if let Some(p) = self.state.write().await.products.get_mut(&id) {
            p.average_rate = average;
            p.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut state = self.state.write().await;
        state.carts.retain(|id, c| *id == cart.id || c.user_id != cart.user_id);
        state.carts.insert(cart.id, cart.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.orders.values().any(|o| o.payment_id == order.payment_id) {
            return Err(EcommerceError::StorageError(format!("duplicate payment id {}", order.payment_id)));
        }
        let mut order = order.clone();
        order.events.clear();
        state.orders.insert(order.id, order);
        Ok(())
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        Ok(state.orders.get_mut(&id).map(|o| {
            o.set_status(status);
            o.events.clear();
            o.clone()
        }))
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn find_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.values().find(|o| o.payment_id == payment_id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>> {
        let state = self.state.read().await;
        let mut mine: Vec<&Order> = state.orders.values().filter(|o| o.user_id == user_id).collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine.into_iter().map(Order::summary).collect())
    }

    async fn all_orders(&self) -> Result<Vec<OrderSummary>> {
        let state = self.state.read().await;
        let mut all: Vec<&Order> = state.orders.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all.into_iter().map(Order::summary).collect())
    }

    async fn has_paid_order_with_product(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.orders.values()
            .any(|o| o.user_id == user_id && o.is_paid() && o.contains_product(product_id)))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut state = self.state.write().await;
        if state.reviews.iter().any(|r| r.user_id == review.user_id && r.product_id == review.product_id) {
            return Err(EcommerceError::AlreadyReviewed);
        }
        let mut review = review.clone();
        review.events.clear();
        state.reviews.push(review);
        Ok(())
    }

    async fn find_review(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>> {
        Ok(self.state.read().await.reviews.iter().find(|r| r.user_id == user_id && r.product_id == product_id).cloned())
    }

    async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        let mut found: Vec<Review> = state.reviews.iter().filter(|r| r.product_id == product_id).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn average_rate(&self, product_id: Uuid) -> Result<Option<f64>> {
        let state = self.state.read().await;
        let rates: Vec<_> = state.reviews.iter().filter(|r| r.product_id == product_id).map(|r| r.rate).collect();
        Ok(crate::domain::aggregates::review::average(&rates))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        let clash = state.users.values().any(|u| {
            u.username.eq_ignore_ascii_case(&user.username) || u.email.eq_ignore_ascii_case(&user.email)
        });
        if clash { return Err(EcommerceError::Validation("Username or email already registered".into())); }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        Ok(self.state.read().await.users.values()
            .any(|u| u.username.eq_ignore_ascii_case(username) || u.email.eq_ignore_ascii_case(email)))
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn insert_address(&self, address: &Address) -> Result<()> {
        self.state.write().await.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn addresses_for_user(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let state = self.state.read().await;
        let mut mine: Vec<Address> = state.addresses.values().filter(|a| a.user_id == user_id).cloned().collect();
        mine.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(mine)
    }

    async fn update_address(&self, user_id: Uuid, id: Uuid, fields: AddressFields) -> Result<Option<Address>> {
        let mut state = self.state.write().await;
        match state.addresses.get_mut(&id) {
            Some(a) if a.user_id == user_id => {
                a.replace(fields);
                Ok(Some(a.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>> {
        let mut state = self.state.write().await;
        if state.addresses.get(&id).is_some_and(|a| a.user_id == user_id) {
            return Ok(state.addresses.remove(&id));
        }
        Ok(None)
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn insert_feature(&self, feature: &FeatureImage) -> Result<()> {
        self.state.write().await.features.push(feature.clone());
        Ok(())
    }

    async fn features(&self) -> Result<Vec<FeatureImage>> {
        Ok(self.state.read().await.features.clone())
    }
}

#[async_trait]
impl PaymentLedger for MemoryStore {
    async fn is_session_processed(&self, session_id: &str) -> Result<bool> {
        Ok(self.state.read().await.processed_sessions.contains(session_id))
    }

    async fn apply_payment_confirmation(&self, c: &PaymentConfirmation) -> Result<ConfirmationOutcome> {
        let mut state = self.state.write().await;
        if state.processed_sessions.contains(&c.session_id) {
            return Ok(ConfirmationOutcome::AlreadyProcessed);
        }

        // Validate every decrement against current stock before touching anything.
        let mut requested: HashMap<Uuid, u32> = HashMap::new();
        for d in &c.decrements {
            let slot = requested.entry(d.product_id).or_default();
            *slot = slot.saturating_add(d.quantity);
        }
        for (product_id, quantity) in &requested {
            let covered = state.products.get(product_id).is_some_and(|p| p.total_stock.covers(*quantity));
            if !covered {
                return Err(EcommerceError::InsufficientInventory(format!("Not enough stock for product: {product_id}")));
            }
        }

        for (product_id, quantity) in requested {
            if let Some(p) = state.products.get_mut(&product_id) {
                p.remove_inventory(quantity)?;
                p.events.clear();
            }
        }
        let mut order = c.order.clone();
        order.events.clear();
        state.orders.insert(order.id, order);
        if state.carts.get(&c.cart_id).is_some_and(|cart| cart.user_id == c.order.user_id) {
            state.carts.remove(&c.cart_id);
        }
        state.processed_sessions.insert(c.session_id.clone());
        Ok(ConfirmationOutcome::Applied)
    }
}
