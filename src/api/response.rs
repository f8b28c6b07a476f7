//! The JSON envelope every endpoint answers with.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use tracing::error;

use crate::services::catalog::Pagination;
use crate::EcommerceError;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self { Self::with_status(StatusCode::OK, message, Some(data)) }

    pub fn created(message: impl Into<String>, data: T) -> Self { Self::with_status(StatusCode::CREATED, message, Some(data)) }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.body.pagination = Some(pagination);
        self
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self { status, body: Envelope { success: true, message: message.into(), data, pagination: None, error: None } }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self { Self::with_status(StatusCode::OK, message, None) }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response { (self.status, Json(self.body)).into_response() }
}

pub fn status_of(err: &EcommerceError) -> StatusCode {
    use EcommerceError::*;
    match err {
        Validation(_) | InsufficientInventory(_) | AlreadyReviewed | InvalidSignature(_) => StatusCode::BAD_REQUEST,
        NotFound(_) | ProductNotFound | OrderNotFound | CartNotFound => StatusCode::NOT_FOUND,
        Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Forbidden => StatusCode::FORBIDDEN,
        Payment(_) | ImageHost(_) | StorageError(_) | Config(_) | Internal(_) | ServiceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        let message = match &self {
            Self::ServiceFailure(message) => message.to_string(),
            e if e.is_internal() => {
                error!(error = %e, "request failed");
                "Internal Server Error".to_string()
            }
            e => e.to_string(),
        };
        let body: Envelope<()> = Envelope { success: false, message, data: None, pagination: None, error: None };
        (status, Json(body)).into_response()
    }
}
