//! Application services. Each one owns the store handles it needs and
//! drains aggregate events into the publisher after a successful write.

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod features;
pub mod orders;
pub mod reconciliation;
pub mod reviews;

pub use addresses::AddressService;
pub use auth::{AuthService, Claims, Identity};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use features::FeatureService;
pub use orders::OrderService;
pub use reconciliation::{ReconciliationService, WebhookOutcome};
pub use reviews::ReviewService;
