//! Admin-only product, image and order management.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::warn;

use super::extract::{parse_id, AdminUser, JsonBody};
use super::response::ApiResponse;
use super::AppState;
use crate::domain::aggregates::{NewProduct, Order, OrderSummary, Product, ProductUpdate};
use crate::media::{UploadedImage, MAX_IMAGE_BYTES};
use crate::{EcommerceError, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products/upload-image", post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)))
        .route("/products/add", post(add_product))
        .route("/products/edit/:id", put(edit_product))
        .route("/products/delete/:id", delete(delete_product))
        .route("/products/get", get(all_products))
        .route("/orders/get", get(all_orders))
        .route("/orders/getOrderDetails/:orderId", get(order_details))
        .route("/orders/updateStatus/:orderId", put(update_status))
}

async fn upload_image(State(s): State<AppState>, _admin: AdminUser, mut multipart: Multipart) -> Result<ApiResponse<UploadedImage>> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| EcommerceError::Validation(format!("Invalid upload: {}", e.body_text()));
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("image") { continue; }
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        if !content_type.starts_with("image/") {
            return Err(EcommerceError::Validation("Only image files are allowed.".into()));
        }
        let bytes = field.bytes().await.map_err(bad_upload)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            warn!(size = bytes.len(), "upload over size limit");
            return Err(EcommerceError::Validation("Image exceeds the 5 MiB limit.".into()));
        }
        if bytes.is_empty() { break; }
        let uploaded = s.images.upload(bytes.to_vec(), content_type).await?;
        return Ok(ApiResponse::ok("Image uploaded successfully", uploaded));
    }
    Err(EcommerceError::Validation("No file uploaded. Please provide an image.".into()))
}

async fn add_product(State(s): State<AppState>, _admin: AdminUser, JsonBody(input): JsonBody<NewProduct>) -> Result<ApiResponse<Product>> {
    Ok(ApiResponse::created("Product added successfully", s.catalog.add_product(input).await?))
}

async fn edit_product(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ProductUpdate>,
) -> Result<ApiResponse<Product>> {
    let id = parse_id(&id, "product")?;
    Ok(ApiResponse::ok("Product updated successfully", s.catalog.edit_product(id, update).await?))
}

async fn delete_product(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> Result<ApiResponse<()>> {
    s.catalog.delete_product(parse_id(&id, "product")?).await?;
    Ok(ApiResponse::message("Product deleted successfully"))
}

async fn all_products(State(s): State<AppState>, _admin: AdminUser) -> Result<ApiResponse<Vec<Product>>> {
    Ok(ApiResponse::ok("Products fetched successfully", s.catalog.all_products().await?))
}

async fn all_orders(State(s): State<AppState>, _admin: AdminUser) -> Result<ApiResponse<Vec<OrderSummary>>> {
    Ok(ApiResponse::ok("Orders fetched successfully", s.orders.list_all().await?))
}

async fn order_details(State(s): State<AppState>, _admin: AdminUser, Path(order_id): Path<String>) -> Result<ApiResponse<Order>> {
    let order_id = parse_id(&order_id, "order")?;
    Ok(ApiResponse::ok("Order fetched successfully", s.orders.detail(order_id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusChange { order_status: Option<String> }

async fn update_status(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
    JsonBody(change): JsonBody<StatusChange>,
) -> Result<ApiResponse<Order>> {
    let order_id = parse_id(&order_id, "order")?;
    let order = s.orders.update_status(order_id, change.order_status.as_deref()).await?;
    Ok(ApiResponse::ok("Order status updated successfully", order))
}
