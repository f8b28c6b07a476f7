//! Storefront feature images

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImage {
    pub id: Uuid,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl FeatureImage {
    pub fn new(image: &str) -> Option<Self> {
        let image = image.trim();
        if image.is_empty() { return None; }
        Some(Self { id: Uuid::now_v7(), image: image.to_string(), created_at: Utc::now() })
    }
}
