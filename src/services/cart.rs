//! Per-user cart operations with populated product lines.

use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Product};
use crate::storage::{CartStore, ProductStore};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i64>,
}

impl CartItemInput {
    fn validated(&self) -> Result<(Uuid, u32)> {
        match (self.product_id, self.quantity.and_then(|q| u32::try_from(q).ok()).filter(|q| *q > 0)) {
            (Some(product_id), Some(quantity)) => Ok((product_id, quantity)),
            _ => Err(EcommerceError::Validation("Invalid input. Please provide a valid productId, and a positive quantity.".into())),
        }
    }
}

/// Cart line joined with the live product.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub image: String,
    pub title: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub quantity: u32,
    pub total_stock: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
}

pub struct CartService {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, products: Arc<dyn ProductStore>) -> Self { Self { carts, products } }

    #[instrument(skip(self, input))]
    pub async fn add(&self, user_id: Uuid, input: CartItemInput) -> Result<CartView> {
        let (product_id, quantity) = input.validated()?;
        let product = self.products.find_product(product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
        let mut cart = self.carts.find_cart_by_user(user_id).await?.unwrap_or_else(|| Cart::for_user(user_id));
        cart.add_item(product_id, quantity, product.total_stock)?;
        self.carts.save_cart(&cart).await?;
        info!(cart_id = %cart.id, product_id = %product_id, quantity, "added to cart");
        self.populate(cart).await
    }

    /// Drops lines whose product has since been deleted.
    pub async fn fetch(&self, user_id: Uuid) -> Result<CartView> {
        let cart = self.existing_cart(user_id).await?;
        self.populate(cart).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, user_id: Uuid, input: CartItemInput) -> Result<CartView> {
        let (product_id, quantity) = input.validated()?;
        let mut cart = self.existing_cart(user_id).await?;
        let product = self.products.find_product(product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
        cart.set_quantity(product_id, quantity, product.total_stock)?;
        self.carts.save_cart(&cart).await?;
        self.populate(cart).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
        let mut cart = self.existing_cart(user_id).await?;
        cart.remove_item(product_id)?;
        self.carts.save_cart(&cart).await?;
        self.populate(cart).await
    }

    async fn existing_cart(&self, user_id: Uuid) -> Result<Cart> {
        self.carts.find_cart_by_user(user_id).await?.filter(|c| !c.is_empty()).ok_or(EcommerceError::CartNotFound)
    }

    async fn populate(&self, mut cart: Cart) -> Result<CartView> {
        let products: Vec<Option<Product>> = try_join_all(cart.items.iter().map(|i| self.products.find_product(i.product_id))).await?;
        let live: Vec<Uuid> = products.iter().flatten().map(|p| p.id).collect();
        if cart.retain_products(&live) {
            self.carts.save_cart(&cart).await?;
        }
        let items = cart.items.iter()
            .filter_map(|item| {
                products.iter().flatten().find(|p| p.id == item.product_id).map(|p| CartLine {
                    product_id: p.id, image: p.image.clone(), title: p.title.clone(), price: p.price,
                    sale_price: p.sale_price, quantity: item.quantity, total_stock: p.total_stock.value(),
                })
            })
            .collect();
        Ok(CartView { cart_id: cart.id, user_id: cart.user_id, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample as sample_product;
    use crate::storage::MemoryStore;

    fn input(product_id: Uuid, quantity: i64) -> CartItemInput {
        CartItemInput { product_id: Some(product_id), quantity: Some(quantity) }
    }

    #[tokio::test]
    async fn test_add_merges_and_guards_stock() {
        let store = Arc::new(MemoryStore::new());
        let product = sample_product("Cap", Decimal::new(12, 0), 3);
        store.insert_product(&product).await.unwrap();
        let svc = CartService::new(store.clone(), store);
        let user = Uuid::new_v4();

        svc.add(user, input(product.id, 2)).await.unwrap();
        let view = svc.add(user, input(product.id, 1)).await.unwrap();
        assert_eq!(view.items[0].quantity, 3);
        assert!(matches!(svc.add(user, input(product.id, 1)).await, Err(EcommerceError::InsufficientInventory(_))));
        assert!(matches!(svc.add(user, input(product.id, 0)).await, Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_fetch_prunes_deleted_products() {
        let store = Arc::new(MemoryStore::new());
        let keep = sample_product("Keep", Decimal::new(5, 0), 5);
        let gone = sample_product("Gone", Decimal::new(5, 0), 5);
        store.insert_product(&keep).await.unwrap();
        store.insert_product(&gone).await.unwrap();
        let svc = CartService::new(store.clone(), store.clone());
        let user = Uuid::new_v4();
        svc.add(user, input(keep.id, 1)).await.unwrap();
        svc.add(user, input(gone.id, 1)).await.unwrap();
        store.delete_product(gone.id).await.unwrap();

        let view = svc.fetch(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(store.find_cart_by_user(user).await.unwrap().unwrap().item_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_cart_and_item() {
        let store = Arc::new(MemoryStore::new());
        let svc = CartService::new(store.clone(), store);
        let user = Uuid::new_v4();
        assert!(matches!(svc.fetch(user).await, Err(EcommerceError::CartNotFound)));
        assert!(matches!(svc.remove(user, Uuid::new_v4()).await, Err(EcommerceError::CartNotFound)));
    }
}
