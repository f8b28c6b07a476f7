//! Purchase-gated reviews.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Review, User};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Rating;
use crate::messaging::EventPublisher;
use crate::storage::{OrderStore, ProductStore, ReviewStore};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub review: String,
    pub rate: Option<i64>,
}

pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    events: EventPublisher,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewStore>, orders: Arc<dyn OrderStore>, products: Arc<dyn ProductStore>, events: EventPublisher) -> Self {
        Self { reviews, orders, products, events }
    }

    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn add(&self, user: &User, input: ReviewInput) -> Result<Review> {
        let invalid = || EcommerceError::Validation("Invalid input data. Ensure all fields are valid.".into());
        let product_id = input.product_id.ok_or_else(invalid)?;
        let rate = input.rate.and_then(|r| u8::try_from(r).ok()).and_then(|r| Rating::new(r).ok()).ok_or_else(invalid)?;
        let mut review = Review::write(product_id, user.id, user.username.clone(), &input.review, rate).map_err(|_| invalid())?;

        if self.products.find_product(product_id).await?.is_none() {
            return Err(EcommerceError::ProductNotFound);
        }
        if !self.orders.has_paid_order_with_product(user.id, product_id).await? {
            return Err(EcommerceError::Validation("You must purchase the product before leaving a review.".into()));
        }
        if self.reviews.find_review(user.id, product_id).await?.is_some() {
            return Err(EcommerceError::AlreadyReviewed);
        }
        self.reviews.insert_review(&review).await?;

        let average = self.reviews.average_rate(product_id).await?.unwrap_or(f64::from(rate.value()));
        self.products.set_average_rate(product_id, average).await?;
        info!(product_id = %product_id, average, "review added, rating recomputed");

        let mut events = review.take_events();
        events.push(DomainEvent::Product(ProductEvent::RatingRecomputed { product_id, average_rate: average }));
        self.events.publish_all(events).await;
        Ok(review)
    }

    pub async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
        self.reviews.reviews_for_product(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::sample_item;
    use crate::domain::aggregates::product::sample as sample_product;
    use crate::domain::aggregates::{Order, Product, ShippingAddress};
    use crate::storage::MemoryStore;
    use rust_decimal::Decimal;

    struct Fixture { store: Arc<MemoryStore>, svc: ReviewService, product: Product }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let product = sample_product("Denim", Decimal::new(60, 0), 10);
        store.insert_product(&product).await.unwrap();
        let svc = ReviewService::new(store.clone(), store.clone(), store.clone(), EventPublisher::disabled());
        Fixture { store, svc, product }
    }

    async fn buy(store: &MemoryStore, user: &User, product: &Product, session: &str) {
        let mut order = Order::place(user.id, Uuid::new_v4(), vec![sample_item(product.id, product.price, 1)], ShippingAddress::default(), product.price, session).unwrap();
        order.confirm_payment().unwrap();
        store.insert_order(&order).await.unwrap();
    }

    fn input(product_id: Uuid, rate: i64) -> ReviewInput {
        ReviewInput { product_id: Some(product_id), review: "Fits well".into(), rate: Some(rate) }
    }

    #[tokio::test]
    async fn test_requires_paid_purchase() {
        let f = fixture().await;
        let user = User::register("ann", "ann@example.com", "hash".into());
        let err = f.svc.add(&user, input(f.product.id, 5)).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(m) if m.contains("purchase")));
    }

    #[tokio::test]
    async fn test_second_review_rejected() {
        let f = fixture().await;
        let user = User::register("ann", "ann@example.com", "hash".into());
        buy(&f.store, &user, &f.product, "cs_r1").await;
        f.svc.add(&user, input(f.product.id, 5)).await.unwrap();
        assert!(matches!(f.svc.add(&user, input(f.product.id, 3)).await, Err(EcommerceError::AlreadyReviewed)));
    }

    #[tokio::test]
    async fn test_average_over_all_reviews() {
        let f = fixture().await;
        for (i, rate) in [5, 4, 4].into_iter().enumerate() {
            let user = User::register(&format!("u{i}"), &format!("u{i}@example.com"), "hash".into());
            buy(&f.store, &user, &f.product, &format!("cs_avg_{i}")).await;
            f.svc.add(&user, input(f.product.id, rate)).await.unwrap();
        }
        let average = f.store.find_product(f.product.id).await.unwrap().unwrap().average_rate;
        assert!((average - 13.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rate_out_of_range() {
        let f = fixture().await;
        let user = User::register("ann", "ann@example.com", "hash".into());
        assert!(matches!(f.svc.add(&user, input(f.product.id, 6)).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(f.svc.add(&user, input(f.product.id, 0)).await, Err(EcommerceError::Validation(_))));
    }
}
