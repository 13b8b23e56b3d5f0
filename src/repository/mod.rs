//! Persistence seam. Handlers only see [`Repository`]; Postgres backs it in
//! production and [`MemoryRepository`] in tests and local runs without a database.

use async_trait::async_trait;

use crate::domain::aggregates::{Order, OrderStatus, Product, ProductDraft};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn get_product(&self, id: i64) -> Result<Option<Product>>;
    async fn get_products(&self, ids: &[i64]) -> Result<Vec<Product>>;
    async fn create_product(&self, draft: ProductDraft) -> Result<Product>;
    async fn update_product(&self, id: i64, draft: ProductDraft) -> Result<Option<Product>>;
    async fn delete_product(&self, id: i64) -> Result<bool>;

    /// Newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;
    /// Persists a placed order and returns it with its assigned id.
    async fn create_order(&self, order: Order) -> Result<Order>;
    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<(Order, OrderStatus)>>;
    async fn delete_order(&self, id: i64) -> Result<bool>;
}
