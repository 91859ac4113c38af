//! Store module
//!
//! Persistence seams used by the checkout engine and the CRUD endpoints.
//!
//! Every mutation performed during a checkout runs inside an explicit unit of
//! work (`UnitOfWork`) that is opened through a `ScopeFactory` and passed by
//! mutable reference into each store call. Only the checkout engine commits or
//! rolls a scope back; the stores never do.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Category, CategoryId, DetailId, LockedProduct, NewCategory, NewProduct,
    NewTransactionDetail, Product, ProductFilter, ProductId, Transaction, TransactionId,
};

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryScope, MemoryStore};
pub use postgres::{PgCategoryRepository, PgInventoryStore, PgScope, PgTransactionLedger};

/// Atomic mutation scope
///
/// Effects performed through a scope become visible to other operations only
/// on `commit`. Dropping a scope without committing discards its effects, so
/// a cancelled checkout rolls back on its own.
#[async_trait]
pub trait UnitOfWork: Send + Sized + 'static {
    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Opens units of work against a backing store
#[async_trait]
pub trait ScopeFactory: Send + Sync {
    type Scope: UnitOfWork;

    async fn begin_scope(&self) -> StoreResult<Self::Scope>;
}

/// Product stock access for checkout
#[async_trait]
pub trait InventoryStore<S: UnitOfWork>: Send + Sync {
    /// Read a product and hold an exclusive lock on it until the scope ends.
    ///
    /// Returns `None` when the product does not exist.
    async fn locked_read(
        &self,
        scope: &mut S,
        product_id: ProductId,
    ) -> StoreResult<Option<LockedProduct>>;

    /// Decrement stock of a product previously read with `locked_read`
    /// in the same scope.
    async fn decrement_stock(
        &self,
        scope: &mut S,
        product_id: ProductId,
        amount: i64,
    ) -> StoreResult<()>;
}

/// Append-only storage of transaction headers and their line items
#[async_trait]
pub trait TransactionLedger<S: UnitOfWork>: Send + Sync {
    async fn insert_header(
        &self,
        scope: &mut S,
        total_amount: i64,
        created_at: DateTime<Utc>,
    ) -> StoreResult<TransactionId>;

    async fn insert_detail(
        &self,
        scope: &mut S,
        detail: &NewTransactionDetail,
    ) -> StoreResult<DetailId>;

    /// All committed transactions, most recent first
    async fn find_all(&self) -> StoreResult<Vec<Transaction>>;

    /// One committed transaction with details in insertion order
    async fn find_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;
}

/// Product record store
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_all(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn create(&self, product: &NewProduct) -> StoreResult<Product>;

    async fn update(&self, id: ProductId, product: &NewProduct) -> StoreResult<Option<Product>>;

    async fn delete(&self, id: ProductId) -> StoreResult<bool>;
}

/// Category record store
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_all(&self) -> StoreResult<Vec<Category>>;

    async fn find_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    async fn create(&self, category: &NewCategory) -> StoreResult<Category>;

    async fn update(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> StoreResult<Option<Category>>;

    async fn delete(&self, id: CategoryId) -> StoreResult<bool>;
}
