//! Public catalog, cart and review routes under `/api/shop`.

use axum::{extract::{Path, State}, routing::{delete, get, post, put}, Router};

use super::extract::{parse_id, AuthUser, JsonBody, QueryParams};
use super::response::ApiResponse;
use super::AppState;
use crate::domain::aggregates::{Product, Review};
use crate::services::cart::{CartItemInput, CartView};
use crate::services::catalog::ProductFilter;
use crate::services::reviews::ReviewInput;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products/get", get(list_products))
        .route("/products/get/:id", get(get_product))
        .route("/products/search/:keyword", get(search_products))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/get", get(fetch_cart))
        .route("/cart/update-cart", put(update_cart))
        .route("/cart/delete/:productId", delete(delete_cart_item))
        .route("/review/add", post(add_review))
        .route("/review/get/:productId", get(list_reviews))
}

async fn list_products(State(s): State<AppState>, QueryParams(filter): QueryParams<ProductFilter>) -> Result<ApiResponse<Vec<Product>>> {
    let page = s.catalog.filtered(filter).await?;
    Ok(ApiResponse::ok("Products fetched successfully", page.products).with_pagination(page.pagination))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Product>> {
    let product = s.catalog.get(parse_id(&id, "product")?).await?;
    Ok(ApiResponse::ok("Product fetched successfully", product))
}

async fn search_products(State(s): State<AppState>, Path(keyword): Path<String>) -> Result<ApiResponse<Vec<Product>>> {
    Ok(ApiResponse::ok("Search completed", s.catalog.search(&keyword).await?))
}

async fn add_to_cart(State(s): State<AppState>, AuthUser(user): AuthUser, JsonBody(input): JsonBody<CartItemInput>) -> Result<ApiResponse<CartView>> {
    Ok(ApiResponse::created("Product added to cart successfully.", s.cart.add(user.id, input).await?))
}

async fn fetch_cart(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<ApiResponse<CartView>> {
    Ok(ApiResponse::ok("Cart fetched successfully.", s.cart.fetch(user.id).await?))
}

async fn update_cart(State(s): State<AppState>, AuthUser(user): AuthUser, JsonBody(input): JsonBody<CartItemInput>) -> Result<ApiResponse<CartView>> {
    Ok(ApiResponse::ok("Cart item updated successfully.", s.cart.update(user.id, input).await?))
}

async fn delete_cart_item(State(s): State<AppState>, AuthUser(user): AuthUser, Path(product_id): Path<String>) -> Result<ApiResponse<CartView>> {
    let product_id = parse_id(&product_id, "product")?;
    Ok(ApiResponse::ok("Cart item deleted successfully.", s.cart.remove(user.id, product_id).await?))
}

async fn add_review(State(s): State<AppState>, AuthUser(user): AuthUser, JsonBody(input): JsonBody<ReviewInput>) -> Result<ApiResponse<Review>> {
    Ok(ApiResponse::created("Review added successfully.", s.reviews.add(&user, input).await?))
}

async fn list_reviews(State(s): State<AppState>, Path(product_id): Path<String>) -> Result<ApiResponse<Vec<Review>>> {
    let product_id = parse_id(&product_id, "product")?;
    Ok(ApiResponse::ok("Reviews fetched successfully.", s.reviews.list_for_product(product_id).await?))
}
