//! Storefront feature images under `/api/feature`.

use axum::{extract::State, routing::{get, post}, Router};

use super::extract::{AdminUser, JsonBody};
use super::response::ApiResponse;
use super::AppState;
use crate::domain::aggregates::FeatureImage;
use crate::services::features::FeatureInput;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/image/add", post(add_feature_image))
        .route("/image/get", get(list_feature_images))
}

async fn add_feature_image(State(s): State<AppState>, _admin: AdminUser, JsonBody(input): JsonBody<FeatureInput>) -> Result<ApiResponse<FeatureImage>> {
    Ok(ApiResponse::created("Feature image added successfully", s.features.add(input).await?))
}

async fn list_feature_images(State(s): State<AppState>) -> Result<ApiResponse<Vec<FeatureImage>>> {
    Ok(ApiResponse::ok("Feature images fetched successfully", s.features.list().await?))
}
