use serde::Deserialize;
use std::sync::Arc;

use crate::domain::aggregates::FeatureImage;
use crate::storage::FeatureStore;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FeatureInput {
    #[serde(default)]
    pub image: Option<String>,
}

pub struct FeatureService { features: Arc<dyn FeatureStore> }

impl FeatureService {
    pub fn new(features: Arc<dyn FeatureStore>) -> Self { Self { features } }

    pub async fn add(&self, input: FeatureInput) -> Result<FeatureImage> {
        let feature = input.image.as_deref().and_then(FeatureImage::new)
            .ok_or_else(|| EcommerceError::Validation("Invalid image data".into()))?;
        self.features.insert_feature(&feature).await?;
        Ok(feature)
    }

    pub async fn list(&self) -> Result<Vec<FeatureImage>> {
        let features = self.features.features().await?;
        if features.is_empty() { return Err(EcommerceError::NotFound("No feature images found".into())); }
        Ok(features)
    }
}
