//! Storefront backend
//!
//! REST service for a small clothing store.
//!
//! ## Features
//! - Product catalog browsing, filtering and keyword search
//! - Per-user carts and saved shipping addresses
//! - Hosted checkout with webhook-driven payment reconciliation
//! - Order tracking and administrative order management
//! - Purchase-gated reviews with recomputed average ratings
//! - Admin product and image management

pub mod api;
pub mod config;
pub mod domain;
pub mod media;
pub mod messaging;
pub mod payments;
pub mod services;
pub mod storage;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Cart is empty or not found.")]
    CartNotFound,

    #[error("{0}")]
    InsufficientInventory(String),

    #[error("You have already reviewed this product.")]
    AlreadyReviewed,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden! You don't have permission to perform this action.")]
    Forbidden,

    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("Payment gateway error: {0}")]
    Payment(String),

    #[error("Image host error: {0}")]
    ImageHost(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Failure already logged by the service; the message is safe to show.
    #[error("{0}")]
    ServiceFailure(&'static str),
}

impl EcommerceError {
    /// Failures whose detail must not reach the client.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Payment(_) | Self::ImageHost(_) | Self::StorageError(_) | Self::Config(_) | Self::Internal(_) | Self::ServiceFailure(_))
    }
}

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self { Self::StorageError(e.to_string()) }
}

impl From<serde_json::Error> for EcommerceError {
    fn from(e: serde_json::Error) -> Self { Self::Internal(format!("serialization: {e}")) }
}

impl From<reqwest::Error> for EcommerceError {
    fn from(e: reqwest::Error) -> Self { Self::Payment(e.to_string()) }
}

impl From<jsonwebtoken::errors::Error> for EcommerceError {
    fn from(e: jsonwebtoken::errors::Error) -> Self { Self::Unauthorized(format!("Unauthorized user! Invalid or expired token: {e}")) }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(format!("Validation failed: {e}")) }
}

impl From<domain::aggregates::ProductError> for EcommerceError {
    fn from(e: domain::aggregates::ProductError) -> Self {
        match e {
            domain::aggregates::ProductError::InsufficientInventory { .. } => Self::InsufficientInventory(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<domain::aggregates::CartError> for EcommerceError {
    fn from(e: domain::aggregates::CartError) -> Self {
        match e {
            domain::aggregates::CartError::ItemNotFound => Self::NotFound(e.to_string()),
            domain::aggregates::CartError::InsufficientStock { .. } => Self::InsufficientInventory(e.to_string()),
            domain::aggregates::CartError::InvalidQuantity => Self::Validation(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
