//! Checkout, payment webhook and the caller's order history.

use axum::{body::Bytes, extract::{Path, State}, http::HeaderMap, routing::{get, post}, Router};

use super::extract::{parse_id, AuthUser, JsonBody};
use super::response::ApiResponse;
use super::AppState;
use crate::domain::aggregates::{Order, OrderSummary};
use crate::services::checkout::{CheckoutRequest, CheckoutStarted};
use crate::Result;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/add", post(create_order))
        .route("/checkout/webhook", post(payment_webhook))
        .route("/getOrders", get(list_orders))
        .route("/getOrderDetails/:orderId", get(order_details))
}

async fn create_order(State(s): State<AppState>, AuthUser(user): AuthUser, JsonBody(request): JsonBody<CheckoutRequest>) -> Result<ApiResponse<CheckoutStarted>> {
    Ok(ApiResponse::ok("Order created successfully", s.checkout.start(user.id, request).await?))
}

/// Takes the raw body: the signature covers the exact bytes sent.
async fn payment_webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<ApiResponse<()>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = s.reconciliation.handle_webhook(&body, signature).await?;
    Ok(ApiResponse::message(outcome.message()))
}

async fn list_orders(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<ApiResponse<Vec<OrderSummary>>> {
    Ok(ApiResponse::ok("Orders fetched successfully", s.orders.list_for_user(user.id).await?))
}

async fn order_details(State(s): State<AppState>, AuthUser(user): AuthUser, Path(order_id): Path<String>) -> Result<ApiResponse<Order>> {
    let order_id = parse_id(&order_id, "order")?;
    Ok(ApiResponse::ok("Order fetched successfully", s.orders.detail_for_user(user.id, order_id).await?))
}
