//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::Rating;
use crate::domain::events::{DomainEvent, ReviewEvent};

/// At most one per (user, product).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub review: String,
    pub rate: Rating,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

impl Review {
    pub fn write(product_id: Uuid, user_id: Uuid, username: impl Into<String>, text: &str, rate: Rating) -> Result<Self, ReviewError> {
        let text = text.trim();
        if text.is_empty() { return Err(ReviewError::EmptyText); }
        let now = Utc::now();
        let mut review = Self {
            id: Uuid::now_v7(), product_id, user_id, username: username.into(), review: text.to_string(), rate,
            created_at: now, updated_at: now, events: vec![],
        };
        review.events.push(DomainEvent::Review(ReviewEvent::Added { review_id: review.id, product_id, rate: rate.value() }));
        Ok(review)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
}

/// Arithmetic mean of every rate; `None` for no reviews.
pub fn average(rates: &[Rating]) -> Option<f64> {
    if rates.is_empty() { return None; }
    let sum: u32 = rates.iter().map(|r| u32::from(r.value())).sum();
    Some(f64::from(sum) / rates.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("Review text must not be empty")]
    EmptyText,
}
