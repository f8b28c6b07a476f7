//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Quantity;

/// One cart per user; created on the first add.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, items: vec![], created_at: now, updated_at: now }
    }

    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.items.iter().find(|i| i.product_id == product_id).map_or(0, |i| i.quantity)
    }

    /// Adds or merges a line; the merged quantity may not exceed `stock`.
    pub fn add_item(&mut self, product_id: Uuid, quantity: u32, stock: Quantity) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        let wanted = self.quantity_of(product_id).saturating_add(quantity);
        if !stock.covers(wanted) { return Err(CartError::InsufficientStock { available: stock.value() }); }
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => existing.quantity = wanted,
            None => self.items.push(CartItem { product_id, quantity }),
        }
        self.touch();
        Ok(())
    }

    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32, stock: Quantity) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        if !stock.covers(quantity) { return Err(CartError::InsufficientStock { available: stock.value() }); }
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    /// Drops lines whose product no longer exists; returns whether anything changed.
    pub fn retain_products(&mut self, live: &[Uuid]) -> bool {
        let before = self.items.len();
        self.items.retain(|i| live.contains(&i.product_id));
        let changed = self.items.len() != before;
        if changed { self.touch(); }
        changed
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Product not found in cart.")]
    ItemNotFound,
    #[error("Quantity must be a positive number.")]
    InvalidQuantity,
    #[error("Insufficient stock. Only {available} units available.")]
    InsufficientStock { available: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::for_user(Uuid::new_v4());
        cart.add_item(p1, 2, Quantity::new(5)).unwrap();
        assert_eq!(cart.item_count(), 1);
        cart.add_item(p1, 1, Quantity::new(5)).unwrap();
        assert_eq!(cart.items[0].quantity, 3); // Merged
        assert_eq!(cart.add_item(p1, 3, Quantity::new(5)), Err(CartError::InsufficientStock { available: 5 }));
        assert_eq!(cart.quantity_of(p1), 3);
    }

    #[test]
    fn test_first_add_checks_stock() {
        let mut cart = Cart::for_user(Uuid::new_v4());
        assert!(cart.add_item(Uuid::new_v4(), 2, Quantity::new(1)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_and_remove() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::for_user(Uuid::new_v4());
        cart.add_item(p1, 1, Quantity::new(9)).unwrap();
        cart.set_quantity(p1, 4, Quantity::new(9)).unwrap();
        assert_eq!(cart.quantity_of(p1), 4);
        assert_eq!(cart.set_quantity(p2, 1, Quantity::new(9)), Err(CartError::ItemNotFound));
        assert_eq!(cart.remove_item(p2), Err(CartError::ItemNotFound));
        cart.remove_item(p1).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_retain_products() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::for_user(Uuid::new_v4());
        cart.add_item(p1, 1, Quantity::new(1)).unwrap();
        cart.add_item(p2, 1, Quantity::new(1)).unwrap();
        assert!(cart.retain_products(&[p2]));
        assert!(!cart.retain_products(&[p2]));
        assert_eq!(cart.items, vec![CartItem { product_id: p2, quantity: 1 }]);
    }
}
