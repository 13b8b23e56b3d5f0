//! Postgres-backed repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::domain::aggregates::{Address, ContactInfo, InstallationDetails, Order, OrderItem, OrderStatus, Product, ProductDraft};
use crate::domain::value_objects::{Category, Money};
use crate::repository::Repository;
use crate::Result;

const PRODUCT_COLUMNS: &str = "id, title, description, price, our_price, cost, category, is_service, is_custom, features, technical_details, image_url, warranty, installation_available, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, reference, contact, shipping_address, installation, payment_method, po_number, signature, status, subtotal, tax, installation_price, total, cost, profit, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64, title: String, description: String, price: Money, our_price: Option<Money>, cost: Option<Money>,
    category: Category, is_service: bool, is_custom: bool, features: Vec<String>,
    technical_details: Json<BTreeMap<String, String>>, image_url: Option<String>, warranty: Option<String>,
    installation_available: bool, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id, title: r.title, description: r.description, price: r.price, our_price: r.our_price, cost: r.cost,
            category: r.category, is_service: r.is_service, is_custom: r.is_custom, features: r.features,
            technical_details: r.technical_details.0, image_url: r.image_url, warranty: r.warranty,
            installation_available: r.installation_available, created_at: r.created_at, updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64, reference: Uuid, contact: Json<ContactInfo>, shipping_address: Json<Address>,
    installation: Option<Json<InstallationDetails>>, payment_method: String, po_number: Option<String>,
    signature: Option<String>, status: String, subtotal: Money, tax: Money, installation_price: Money,
    total: Money, cost: Money, profit: Money, notes: Option<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: i64, product_id: Option<i64>, title: String, category: Category, quantity: i32,
    price_at_time: Money, cost_at_time: Option<Money>, taxable: bool,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order> {
        Ok(Order {
            id: self.id, reference: self.reference, contact: self.contact.0, shipping_address: self.shipping_address.0,
            installation: self.installation.map(|j| j.0), payment_method: self.payment_method.parse()?,
            po_number: self.po_number, signature: self.signature, status: self.status.parse()?, items,
            subtotal: self.subtotal, tax: self.tax, installation_price: self.installation_price, total: self.total,
            cost: self.cost, profit: self.profit, notes: self.notes, created_at: self.created_at, updated_at: self.updated_at,
        })
    }
}

impl From<ItemRow> for OrderItem {
    fn from(r: ItemRow) -> Self {
        OrderItem {
            product_id: r.product_id, title: r.title, category: r.category,
            quantity: u32::try_from(r.quantity).unwrap_or_default(),
            price_at_time: r.price_at_time, cost_at_time: r.cost_at_time, taxable: r.taxable,
        }
    }
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT order_id, product_id, title, category, quantity, price_at_time, cost_at_time, taxable FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
        ).bind(&ids).fetch_all(&self.pool).await?;
        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items { by_order.entry(item.order_id).or_default().push(item.into()); }
        rows.into_iter().map(|r| { let items = by_order.remove(&r.id).unwrap_or_default(); r.into_order(items) }).collect()
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, order_id: i64, items: &[OrderItem]) -> Result<()> {
        for (position, item) in items.iter().enumerate() {
            sqlx::query("INSERT INTO order_items (order_id, position, product_id, title, category, quantity, price_at_time, cost_at_time, taxable) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
                .bind(order_id).bind(position as i32).bind(item.product_id).bind(&item.title).bind(&item.category)
                .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX)).bind(item.price_at_time).bind(item.cost_at_time).bind(item.taxable)
                .execute(&mut **tx).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn get_products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids).fetch_all(&self.pool).await?;
        let mut found: HashMap<i64, Product> = rows.into_iter().map(|r| (r.id, Product::from(r))).collect();
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn create_product(&self, d: ProductDraft) -> Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (title, description, price, our_price, cost, category, is_service, is_custom, features, technical_details, image_url, warranty, installation_available) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {PRODUCT_COLUMNS}"
        ))
            .bind(&d.title).bind(&d.description).bind(d.price).bind(d.our_price).bind(d.cost).bind(&d.category)
            .bind(d.is_service).bind(d.is_custom).bind(&d.features).bind(Json(&d.technical_details))
            .bind(&d.image_url).bind(&d.warranty).bind(d.installation_available)
            .fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn update_product(&self, id: i64, d: ProductDraft) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET title = $2, description = $3, price = $4, our_price = $5, cost = $6, category = $7, is_service = $8, is_custom = $9, \
             features = $10, technical_details = $11, image_url = $12, warranty = $13, installation_available = $14, updated_at = NOW() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
            .bind(id).bind(&d.title).bind(&d.description).bind(d.price).bind(d.our_price).bind(d.cost).bind(&d.category)
            .bind(d.is_service).bind(d.is_custom).bind(&d.features).bind(Json(&d.technical_details))
            .bind(&d.image_url).bind(&d.warranty).bind(d.installation_available)
            .fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn delete_product(&self, id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"))
            .fetch_all(&self.pool).await?;
        self.attach_items(rows).await
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_all(&self.pool).await?;
        Ok(self.attach_items(rows).await?.pop())
    }

    async fn create_order(&self, mut order: Order) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO orders (reference, contact, shipping_address, installation, payment_method, po_number, signature, status, \
             subtotal, tax, installation_price, total, cost, profit, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) RETURNING id",
        )
            .bind(order.reference).bind(Json(&order.contact)).bind(Json(&order.shipping_address)).bind(order.installation.as_ref().map(Json))
            .bind(order.payment_method.as_str()).bind(&order.po_number).bind(&order.signature).bind(order.status.as_str())
            .bind(order.subtotal).bind(order.tax).bind(order.installation_price).bind(order.total).bind(order.cost).bind(order.profit)
            .bind(&order.notes).bind(order.created_at).bind(order.updated_at)
            .fetch_one(&mut *tx).await?;
        Self::insert_items(&mut tx, id, &order.items).await?;
        tx.commit().await?;
        order.id = id;
        tracing::debug!(order_id = id, items = order.items.len(), "order persisted");
        Ok(order)
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<(Order, OrderStatus)>> {
        let previous: Option<(String,)> = sqlx::query_as(
            "WITH prev AS (SELECT id, status FROM orders WHERE id = $1 FOR UPDATE) \
             UPDATE orders o SET status = $2, updated_at = NOW() FROM prev WHERE o.id = prev.id RETURNING prev.status",
        ).bind(id).bind(status.as_str()).fetch_optional(&self.pool).await?;
        let Some((previous,)) = previous else { return Ok(None) };
        let previous: OrderStatus = previous.parse()?;
        Ok(self.get_order(id).await?.map(|order| (order, previous)))
    }

    async fn delete_order(&self, id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}
