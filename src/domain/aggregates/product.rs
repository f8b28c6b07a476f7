//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Brand, Category, Quantity};
use crate::domain::events::{DomainEvent, ProductEvent};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub brand: Brand,
    pub category: Category,
    pub image: String,
    pub total_stock: Quantity,
    pub average_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Fields an admin supplies when adding a product.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub brand: Brand,
    pub category: Category,
    pub image: String,
    pub total_stock: u32,
}

/// Partial edit; absent fields keep their current value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub brand: Option<Brand>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub total_stock: Option<u32>,
}

impl Product {
    pub fn create(input: NewProduct) -> Result<Self, ProductError> {
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), title: input.title.trim().to_string(), description: input.description.trim().to_string(),
            price: input.price, sale_price: input.sale_price, brand: input.brand, category: input.category,
            image: input.image.trim().to_string(), total_stock: Quantity::new(input.total_stock), average_rate: 0.0,
            created_at: now, updated_at: now, events: vec![],
        };
        product.validate()?;
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: product.id, title: product.title.clone() }));
        Ok(product)
    }


    pub fn apply_update(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        let mut next = self.clone();
        if let Some(title) = update.title { next.title = title.trim().to_string(); }
        if let Some(description) = update.description { next.description = description.trim().to_string(); }
        if let Some(price) = update.price { next.price = price; }
        if let Some(sale_price) = update.sale_price { next.sale_price = Some(sale_price); }
        if let Some(brand) = update.brand { next.brand = brand; }
        if let Some(category) = update.category { next.category = category; }
        if let Some(image) = update.image { next.image = image.trim().to_string(); }
        if let Some(stock) = update.total_stock { next.total_stock = Quantity::new(stock); }
        next.validate()?;
        *self = next;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Updated { product_id: self.id }));
        Ok(())
    }

    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.total_stock = self.total_stock.subtract(qty).ok_or(ProductError::InsufficientInventory {
            title: self.title.clone(), requested: qty, available: self.total_stock.value(),
        })?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::InventoryRemoved {
            product_id: self.id, quantity: qty, remaining: self.total_stock.value(),
        }));
        Ok(())
    }

    fn validate(&self) -> Result<(), ProductError> {
        if self.title.is_empty() { return Err(ProductError::MissingField("title")); }
        if self.description.is_empty() { return Err(ProductError::MissingField("description")); }
        if self.price <= Decimal::ZERO { return Err(ProductError::InvalidPrice); }
        if let Some(sale) = self.sale_price {
            if sale < Decimal::ZERO || sale > self.price { return Err(ProductError::InvalidSalePrice); }
        }
        if !is_image_ref(&self.image) { return Err(ProductError::InvalidImage); }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Hosted http(s) URL, or an inline `data:image/*;base64,` URI as handed
/// back by uploads when no image host is configured.
fn is_image_ref(image: &str) -> bool {
    if let Some(rest) = image.strip_prefix("data:image/") {
        return rest.split_once(";base64,").is_some_and(|(kind, body)| !kind.is_empty() && !body.is_empty());
    }
    (image.starts_with("https://") || image.starts_with("http://")) && image.len() >= 12
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProductError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid price.")]
    InvalidPrice,
    #[error("Invalid sale price. It should be less than or equal to the original price.")]
    InvalidSalePrice,
    #[error("Invalid image URL")]
    InvalidImage,
    #[error("Not enough stock for product: {title} (requested {requested}, available {available})")]
    InsufficientInventory { title: String, requested: u32, available: u32 },
}

#[cfg(test)]
pub(crate) fn sample(title: &str, price: Decimal, stock: u32) -> Product {
    Product::create(NewProduct {
        title: title.into(), description: format!("{title} description"), price, sale_price: None,
        brand: Brand::Nike, category: Category::Men, image: "https://img.example.com/p.png".into(), total_stock: stock,
    }).unwrap()
}
