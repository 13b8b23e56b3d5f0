//! In-process repository. Ids are assigned from per-table counters.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::aggregates::{Order, OrderStatus, Product, ProductDraft};
use crate::repository::Repository;
use crate::Result;

#[derive(Default)]
struct Tables {
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    next_product_id: i64,
    next_order_id: i64,
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self { Self::default() }

    pub async fn with_products(drafts: impl IntoIterator<Item = ProductDraft>) -> Result<Self> {
        let repo = Self::new();
        for draft in drafts { repo.create_product(draft).await?; }
        Ok(repo)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.next_product_id += 1;
        let product = Product::from_draft(tables.next_product_id, draft);
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, draft: ProductDraft) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.get_mut(&id).map(|p| { p.apply(draft); p.clone() }))
    }

    async fn delete_product(&self, id: i64) -> Result<bool> {
        Ok(self.tables.write().await.products.remove(&id).is_some())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn create_order(&self, mut order: Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.next_order_id += 1;
        order.id = tables.next_order_id;
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<(Order, OrderStatus)>> {
        let mut tables = self.tables.write().await;
        Ok(tables.orders.get_mut(&id).map(|o| {
            let previous = o.set_status(status);
            (o.clone(), previous)
        }))
    }

    async fn delete_order(&self, id: i64) -> Result<bool> {
        Ok(self.tables.write().await.orders.remove(&id).is_some())
    }
}
