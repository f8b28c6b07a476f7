//! Postgres store backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use std::fmt::Display;
use tracing::{debug, info};
use uuid::Uuid;

use super::*;
use crate::domain::aggregates::{CartItem, LineItem, ShippingAddress};
use crate::domain::value_objects::{Quantity, Rating};
use crate::EcommerceError;

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| EcommerceError::StorageError(e.to_string()))?;
        info!("database migrations applied");
        Ok(())
    }
}

fn corrupt(field: &str, value: impl Display) -> EcommerceError {
    EcommerceError::StorageError(format!("unexpected {field} value in storage: {value}"))
}

fn to_db_count(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| EcommerceError::Validation(format!("quantity {value} is too large")))
}

// =============================================================================
// Rows
// =============================================================================

#[derive(FromRow)]
struct ProductRow {
    id: Uuid, title: String, description: String, price: Decimal, sale_price: Option<Decimal>,
    brand: String, category: String, image: String, total_stock: i32, average_rate: f64,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = EcommerceError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id, title: r.title, description: r.description, price: r.price, sale_price: r.sale_price,
            brand: r.brand.parse().map_err(|_| corrupt("brand", &r.brand))?,
            category: r.category.parse().map_err(|_| corrupt("category", &r.category))?,
            image: r.image,
            total_stock: Quantity::new(u32::try_from(r.total_stock).map_err(|_| corrupt("total_stock", r.total_stock))?),
            average_rate: r.average_rate, created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        })
    }
}

#[derive(FromRow)]
struct CartRow { id: Uuid, user_id: Uuid, items: Json<Vec<CartItem>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl From<CartRow> for Cart {
    fn from(r: CartRow) -> Self {
        Cart { id: r.id, user_id: r.user_id, items: r.items.0, created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, cart_id: Uuid, cart_items: Json<Vec<LineItem>>, address: Json<ShippingAddress>,
    total_amount: Decimal, order_status: String, payment_method: String, payment_status: String, payment_id: String,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id, user_id: r.user_id, cart_id: r.cart_id, cart_items: r.cart_items.0, address: r.address.0,
            total_amount: r.total_amount,
            order_status: r.order_status.parse().map_err(|_| corrupt("order_status", &r.order_status))?,
            payment_method: r.payment_method.parse().map_err(|_| corrupt("payment_method", &r.payment_method))?,
            payment_status: r.payment_status.parse().map_err(|_| corrupt("payment_status", &r.payment_status))?,
            payment_id: r.payment_id, created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        })
    }
}

#[derive(FromRow)]
struct OrderSummaryRow {
    id: Uuid, cart_id: Uuid, total_amount: Decimal, order_status: String, payment_status: String, payment_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = EcommerceError;
    fn try_from(r: OrderSummaryRow) -> Result<Self> {
        Ok(OrderSummary {
            id: r.id, cart_id: r.cart_id, total_amount: r.total_amount,
            order_status: r.order_status.parse().map_err(|_| corrupt("order_status", &r.order_status))?,
            payment_status: r.payment_status.parse().map_err(|_| corrupt("payment_status", &r.payment_status))?,
            payment_id: r.payment_id, created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid, product_id: Uuid, user_id: Uuid, username: String, review: String, rate: i16,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = EcommerceError;
    fn try_from(r: ReviewRow) -> Result<Self> {
        let rate = u8::try_from(r.rate).ok().and_then(|v| Rating::new(v).ok()).ok_or_else(|| corrupt("rate", r.rate))?;
        Ok(Review {
            id: r.id, product_id: r.product_id, user_id: r.user_id, username: r.username, review: r.review, rate,
            created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        })
    }
}

#[derive(FromRow)]
struct UserRow { id: Uuid, username: String, email: String, password_hash: String, role: String, created_at: DateTime<Utc> }

impl TryFrom<UserRow> for User {
    type Error = EcommerceError;
    fn try_from(r: UserRow) -> Result<Self> {
        Ok(User {
            id: r.id, username: r.username, email: r.email, password_hash: r.password_hash,
            role: r.role.parse().map_err(|_| corrupt("role", &r.role))?, created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct AddressRow {
    id: Uuid, user_id: Uuid, address: String, city: String, pin_code: String, phone: String, note: String,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Address {
            id: r.id, user_id: r.user_id,
            fields: AddressFields { address: r.address, city: r.city, pin_code: r.pin_code, phone: r.phone, note: r.note },
            created_at: r.created_at, updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct FeatureRow { id: Uuid, image: String, created_at: DateTime<Utc> }

// =============================================================================
// Products
// =============================================================================

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    qb.push(" WHERE TRUE");
    if !query.categories.is_empty() {
        let categories: Vec<String> = query.categories.iter().map(ToString::to_string).collect();
        qb.push(" AND category = ANY(").push_bind(categories).push(")");
    }
    if !query.brands.is_empty() {
        let brands: Vec<String> = query.brands.iter().map(ToString::to_string).collect();
        qb.push(" AND brand = ANY(").push_bind(brands).push(")");
    }
}

fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::PriceAsc => " ORDER BY price ASC, id",
        SortOrder::PriceDesc => " ORDER BY price DESC, id",
        SortOrder::TitleAsc => " ORDER BY title ASC, id",
        SortOrder::TitleDesc => " ORDER BY title DESC, id",
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, p: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, title, description, price, sale_price, brand, category, image, total_stock, average_rate, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)")
            .bind(p.id).bind(&p.title).bind(&p.description).bind(p.price).bind(p.sale_price).bind(p.brand.as_ref())
            .bind(p.category.as_ref()).bind(&p.image).bind(to_db_count(p.total_stock.value())?).bind(p.average_rate)
            .bind(p.created_at).bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn save_product(&self, p: &Product) -> Result<()> {
        sqlx::query("UPDATE products SET title = $2, description = $3, price = $4, sale_price = $5, brand = $6, category = $7, image = $8, total_stock = $9, average_rate = $10, updated_at = $11 WHERE id = $1")
            .bind(p.id).bind(&p.title).bind(&p.description).bind(p.price).bind(p.sale_price).bind(p.brand.as_ref())
            .bind(p.category.as_ref()).bind(&p.image).bind(to_db_count(p.total_stock.value())?).bind(p.average_rate)
            .bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_product_filters(&mut qb, query);
        qb.push(order_by(query.sort));
        qb.push(" LIMIT ").push_bind(query.limit as i64).push(" OFFSET ").push_bind(query.offset as i64);
        qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    async fn count_products(&self, query: &ProductQuery) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut qb, query);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    async fn search_products(&self, keyword: &SearchKeyword, limit: u32) -> Result<Vec<Product>> {
        debug!(pattern = keyword.pattern(), "catalog search");
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE title ~* $1 OR brand ~* $1 OR category ~* $1 OR description ~* $1 ORDER BY title, id LIMIT $2")
            .bind(keyword.pattern()).bind(i64::from(limit))
            .fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    async fn set_average_rate(&self, id: Uuid, average: f64) -> Result<()> {
        sqlx::query("UPDATE products SET average_rate = $2, updated_at = NOW() WHERE id = $1")
            .bind(id).bind(average).execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Carts
// =============================================================================

#[async_trait]
impl CartStore for PgStore {
    async fn find_cart_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?.map(Cart::from))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        sqlx::query("INSERT INTO carts (id, user_id, items, created_at, updated_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at")
            .bind(cart.id).bind(cart.user_id).bind(Json(&cart.items)).bind(cart.created_at).bind(cart.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

async fn update_order<'e, E>(executor: E, o: &Order) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE orders SET order_status = $2, payment_status = $3, updated_at = $4 WHERE id = $1")
        .bind(o.id).bind(o.order_status.as_ref()).bind(o.payment_status.as_ref()).bind(o.updated_at)
        .execute(executor).await?;
    Ok(())
}

const SUMMARY_COLUMNS: &str = "id, cart_id, total_amount, order_status, payment_status, payment_id, created_at";

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, o: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, user_id, cart_id, cart_items, address, total_amount, order_status, payment_method, payment_status, payment_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)")
            .bind(o.id).bind(o.user_id).bind(o.cart_id).bind(Json(&o.cart_items)).bind(Json(&o.address)).bind(o.total_amount)
            .bind(o.order_status.as_ref()).bind(o.payment_method.as_ref()).bind(o.payment_status.as_ref()).bind(&o.payment_id)
            .bind(o.created_at).bind(o.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(status.as_ref()).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn find_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE payment_id = $1")
            .bind(payment_id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>> {
        sqlx::query_as::<_, OrderSummaryRow>(&format!("SELECT {SUMMARY_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"))
            .bind(user_id).fetch_all(&self.pool).await?
            .into_iter().map(OrderSummary::try_from).collect()
    }

    async fn all_orders(&self) -> Result<Vec<OrderSummary>> {
        sqlx::query_as::<_, OrderSummaryRow>(&format!("SELECT {SUMMARY_COLUMNS} FROM orders ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await?
            .into_iter().map(OrderSummary::try_from).collect()
    }

    async fn has_paid_order_with_product(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let needle = serde_json::json!([{ "productId": product_id }]);
        let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE user_id = $1 AND payment_status = 'paid' AND cart_items @> $2)")
            .bind(user_id).bind(Json(needle)).fetch_one(&self.pool).await?;
        Ok(found)
    }
}

// =============================================================================
// Reviews
// =============================================================================

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, r: &Review) -> Result<()> {
        let res = sqlx::query("INSERT INTO reviews (id, product_id, user_id, username, review, rate, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(r.id).bind(r.product_id).bind(r.user_id).bind(&r.username).bind(&r.review).bind(i16::from(r.rate.value()))
            .bind(r.created_at).bind(r.updated_at)
            .execute(&self.pool).await;
        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(EcommerceError::AlreadyReviewed),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_review(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).fetch_optional(&self.pool).await?
            .map(Review::try_from).transpose()
    }

    async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
        sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC")
            .bind(product_id).fetch_all(&self.pool).await?
            .into_iter().map(Review::try_from).collect()
    }

    async fn average_rate(&self, product_id: Uuid) -> Result<Option<f64>> {
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(rate)::float8 FROM reviews WHERE product_id = $1")
            .bind(product_id).fetch_one(&self.pool).await?;
        Ok(avg)
    }
}

// =============================================================================
// Users, addresses, feature images
// =============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, u: &User) -> Result<()> {
        let res = sqlx::query("INSERT INTO users (id, username, email, password_hash, role, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(u.id).bind(&u.username).bind(&u.email).bind(&u.password_hash).bind(u.role.as_ref()).bind(u.created_at)
            .execute(&self.pool).await;
        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(EcommerceError::Validation("Username or email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower($1) OR lower(email) = lower($2))")
            .bind(username).bind(email).fetch_one(&self.pool).await?;
        Ok(taken)
    }
}

#[async_trait]
impl AddressStore for PgStore {
    async fn insert_address(&self, a: &Address) -> Result<()> {
        sqlx::query("INSERT INTO addresses (id, user_id, address, city, pin_code, phone, note, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(a.id).bind(a.user_id).bind(&a.fields.address).bind(&a.fields.city).bind(&a.fields.pin_code)
            .bind(&a.fields.phone).bind(&a.fields.note).bind(a.created_at).bind(a.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn addresses_for_user(&self, user_id: Uuid) -> Result<Vec<Address>> {
        Ok(sqlx::query_as::<_, AddressRow>("SELECT * FROM addresses WHERE user_id = $1 ORDER BY created_at")
            .bind(user_id).fetch_all(&self.pool).await?
            .into_iter().map(Address::from).collect())
    }

    async fn update_address(&self, user_id: Uuid, id: Uuid, f: AddressFields) -> Result<Option<Address>> {
        Ok(sqlx::query_as::<_, AddressRow>("UPDATE addresses SET address = $3, city = $4, pin_code = $5, phone = $6, note = $7, updated_at = NOW() WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id).bind(user_id).bind(&f.address).bind(&f.city).bind(&f.pin_code).bind(&f.phone).bind(&f.note)
            .fetch_optional(&self.pool).await?
            .map(Address::from))
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>> {
        Ok(sqlx::query_as::<_, AddressRow>("DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id).bind(user_id).fetch_optional(&self.pool).await?
            .map(Address::from))
    }
}

#[async_trait]
impl FeatureStore for PgStore {
    async fn insert_feature(&self, f: &FeatureImage) -> Result<()> {
        sqlx::query("INSERT INTO feature_images (id, image, created_at) VALUES ($1, $2, $3)")
            .bind(f.id).bind(&f.image).bind(f.created_at).execute(&self.pool).await?;
        Ok(())
    }

    async fn features(&self) -> Result<Vec<FeatureImage>> {
        Ok(sqlx::query_as::<_, FeatureRow>("SELECT * FROM feature_images ORDER BY created_at")
            .fetch_all(&self.pool).await?
            .into_iter().map(|r| FeatureImage { id: r.id, image: r.image, created_at: r.created_at }).collect())
    }
}

// =============================================================================
// Payment confirmation
// =============================================================================

#[async_trait]
impl PaymentLedger for PgStore {
    async fn is_session_processed(&self, session_id: &str) -> Result<bool> {
        let seen: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM processed_payment_sessions WHERE session_id = $1)")
            .bind(session_id).fetch_one(&self.pool).await?;
        Ok(seen)
    }

    async fn apply_payment_confirmation(&self, c: &PaymentConfirmation) -> Result<ConfirmationOutcome> {
        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query("INSERT INTO processed_payment_sessions (session_id, event_id, order_id, processed_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (session_id) DO NOTHING")
            .bind(&c.session_id).bind(&c.event_id).bind(c.order.id)
            .execute(&mut *tx).await?.rows_affected();
        if recorded == 0 {
            tx.rollback().await?;
            return Ok(ConfirmationOutcome::AlreadyProcessed);
        }

        for d in &c.decrements {
            let updated = sqlx::query("UPDATE products SET total_stock = total_stock - $2, updated_at = NOW() WHERE id = $1 AND total_stock >= $2")
                .bind(d.product_id).bind(to_db_count(d.quantity)?)
                .execute(&mut *tx).await?.rows_affected();
            if updated == 0 {
                tx.rollback().await?;
                return Err(EcommerceError::InsufficientInventory(format!("Not enough stock for product: {}", d.product_id)));
            }
        }

        update_order(&mut *tx, &c.order).await?;
        sqlx::query("DELETE FROM carts WHERE id = $1 AND user_id = $2")
            .bind(c.cart_id).bind(c.order.user_id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(ConfirmationOutcome::Applied)
    }
}
