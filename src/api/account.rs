//! Saved shipping addresses under `/api/account`.

use axum::{extract::{Path, State}, routing::{delete, get, post, put}, Router};

use super::extract::{parse_id, AuthUser, JsonBody};
use super::response::ApiResponse;
use super::AppState;
use crate::domain::aggregates::{Address, AddressFields};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/address/add", post(add_address))
        .route("/address/get", get(list_addresses))
        .route("/address/edit/:id", put(update_address))
        .route("/address/delete/:id", delete(delete_address))
}

async fn add_address(State(s): State<AppState>, AuthUser(user): AuthUser, JsonBody(fields): JsonBody<AddressFields>) -> Result<ApiResponse<Address>> {
    Ok(ApiResponse::created("Address added successfully", s.addresses.add(user.id, fields).await?))
}

async fn list_addresses(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<ApiResponse<Vec<Address>>> {
    Ok(ApiResponse::ok("Addresses fetched successfully", s.addresses.list(user.id).await?))
}

async fn update_address(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(fields): JsonBody<AddressFields>,
) -> Result<ApiResponse<Address>> {
    let id = parse_id(&id, "address")?;
    Ok(ApiResponse::ok("Address updated successfully", s.addresses.update(user.id, id, fields).await?))
}

async fn delete_address(State(s): State<AppState>, AuthUser(user): AuthUser, Path(id): Path<String>) -> Result<ApiResponse<Address>> {
    let id = parse_id(&id, "address")?;
    Ok(ApiResponse::ok("Address deleted successfully.", s.addresses.delete(user.id, id).await?))
}
