//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod review;
pub mod user;
pub mod address;
pub mod feature;

pub use product::{Product, ProductError, NewProduct, ProductUpdate};
pub use order::{Order, OrderError, OrderStatus, OrderSummary, PaymentStatus, PaymentMethod, LineItem, ShippingAddress};
pub use cart::{Cart, CartError, CartItem};
pub use review::{Review, ReviewError};
pub use user::User;
pub use address::{Address, AddressFields};
pub use feature::FeatureImage;
