//! Catalog browsing, search and admin product management.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{NewProduct, Product, ProductUpdate};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{parse_csv, Brand, Category, SearchKeyword, SortOrder};
use crate::messaging::EventPublisher;
use crate::storage::{ProductQuery, ProductStore};
use crate::{EcommerceError, Result};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const SEARCH_LIMIT: u32 = 50;

/// Query string of the listing endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(rename = "Category", alias = "category")]
    pub category: Option<String>,
    #[serde(rename = "Brand", alias = "brand")]
    pub brand: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStore>, events: EventPublisher) -> Self { Self { products, events } }

    #[instrument(skip(self))]
    pub async fn filtered(&self, filter: ProductFilter) -> Result<ProductPage> {
        let categories: Vec<Category> = parse_csv(filter.category.as_deref())
            .map_err(|bad| EcommerceError::Validation(format!("Unknown category: {bad}")))?;
        let brands: Vec<Brand> = parse_csv(filter.brand.as_deref())
            .map_err(|bad| EcommerceError::Validation(format!("Unknown brand: {bad}")))?;
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let query = ProductQuery {
            categories,
            brands,
            sort: SortOrder::from_param(filter.sort_by.as_deref()),
            offset: (page - 1).saturating_mul(limit),
            limit,
        };
        let (products, total) = futures::try_join!(self.products.list_products(&query), self.products.count_products(&query))?;
        Ok(ProductPage {
            products,
            pagination: Pagination { current_page: page, total_pages: total.div_ceil(limit), total_items: total },
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Product> {
        self.products.find_product(id).await?.ok_or(EcommerceError::ProductNotFound)
    }

    /// Rejects short keywords before storage is touched.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Product>> {
        let keyword = SearchKeyword::new(keyword).map_err(|e| EcommerceError::Validation(e.to_string()))?;
        debug!(keyword = keyword.as_str(), "searching catalog");
        self.products.search_products(&keyword, SEARCH_LIMIT).await
    }

    pub async fn all_products(&self) -> Result<Vec<Product>> { self.products.all_products().await }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn add_product(&self, input: NewProduct) -> Result<Product> {
        let mut product = Product::create(input)?;
        self.products.insert_product(&product).await?;
        info!(product_id = %product.id, "product added");
        self.events.publish_all(product.take_events()).await;
        Ok(product)
    }

    #[instrument(skip(self, update))]
    pub async fn edit_product(&self, id: Uuid, update: ProductUpdate) -> Result<Product> {
        let mut product = self.get(id).await?;
        product.apply_update(update)?;
        self.products.save_product(&product).await?;
        self.events.publish_all(product.take_events()).await;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        if !self.products.delete_product(id).await? { return Err(EcommerceError::ProductNotFound); }
        info!(product_id = %id, "product deleted");
        self.events.publish(&DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample as sample_product;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    /// Store that fails the test if any query reaches it.
    struct Untouchable;

    #[async_trait]
    impl ProductStore for Untouchable {
        async fn insert_product(&self, _: &Product) -> Result<()> { unreachable!() }
        async fn save_product(&self, _: &Product) -> Result<()> { unreachable!() }
        async fn find_product(&self, _: Uuid) -> Result<Option<Product>> { unreachable!() }
        async fn delete_product(&self, _: Uuid) -> Result<bool> { unreachable!() }
        async fn list_products(&self, _: &ProductQuery) -> Result<Vec<Product>> { unreachable!() }
        async fn count_products(&self, _: &ProductQuery) -> Result<u64> { unreachable!() }
        async fn search_products(&self, _: &SearchKeyword, _: u32) -> Result<Vec<Product>> { unreachable!() }
        async fn all_products(&self) -> Result<Vec<Product>> { unreachable!() }
        async fn set_average_rate(&self, _: Uuid, _: f64) -> Result<()> { unreachable!() }
    }

    #[tokio::test]
    async fn test_short_keyword_skips_storage() {
        let svc = CatalogService::new(Arc::new(Untouchable), EventPublisher::disabled());
        assert!(matches!(svc.search("ab").await, Err(EcommerceError::Validation(_))));
        assert!(matches!(svc.search("  a  ").await, Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_across_fields() {
        let store = Arc::new(MemoryStore::new());
        let mut tee = sample_product("Summer Tee", Decimal::new(15, 0), 3);
        tee.description = "Light cotton".into();
        store.insert_product(&tee).await.unwrap();
        store.insert_product(&sample_product("Boot", Decimal::new(90, 0), 3)).await.unwrap();
        let svc = CatalogService::new(store, EventPublisher::disabled());

        assert_eq!(svc.search("sUmMeR").await.unwrap().len(), 1);
        assert_eq!(svc.search("COTTON").await.unwrap().len(), 1);
        assert_eq!(svc.search("nike").await.unwrap().len(), 2);
        assert!(svc.search("(.*)").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filtered_pagination() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..25 {
            store.insert_product(&sample_product(&format!("P{i:02}"), Decimal::new(10 + i, 0), 1)).await.unwrap();
        }
        let svc = CatalogService::new(store, EventPublisher::disabled());
        let page = svc.filtered(ProductFilter { page: Some(3), ..Default::default() }).await.unwrap();
        assert_eq!(page.pagination, Pagination { current_page: 3, total_pages: 3, total_items: 25 });
        assert_eq!(page.products.len(), 5);
        assert_eq!(page.products[0].title, "P20");

        let err = svc.filtered(ProductFilter { category: Some("men,aliens".into()), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(m) if m.contains("aliens")));
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let svc = CatalogService::new(Arc::new(MemoryStore::new()), EventPublisher::disabled());
        assert!(matches!(svc.delete_product(Uuid::new_v4()).await, Err(EcommerceError::ProductNotFound)));
    }
}
