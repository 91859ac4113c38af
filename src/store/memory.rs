//! In-memory store
//!
//! Embedded implementation of every store trait, used for local runs and the
//! test suites.
//!
//! Each product row owns an async mutex that plays the role of a database row
//! lock. A `MemoryScope` keeps the guards of every row it locked, together with
//! the stock values and ledger rows it staged. Commit publishes the staged
//! state and then releases the guards; dropping the scope discards it.
//!
//! Commit publishes under the ledger write lock. Plain product reads take the
//! ledger read lock but no row locks, so they see each commit either entirely
//! or not at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::{
    Category, CategoryId, DetailId, LockedProduct, NewCategory, NewProduct,
    NewTransactionDetail, Product, ProductFilter, ProductId, Transaction, TransactionDetail,
    TransactionId,
};

use super::{
    CategoryRepository, InventoryStore, ProductRepository, ScopeFactory, StoreError,
    StoreResult, TransactionLedger, UnitOfWork,
};

/// Default bound on waiting for a row lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct ProductSlot {
    row_lock: Arc<Mutex<()>>,
    product: Product,
}

#[derive(Debug)]
struct Inner {
    categories: DashMap<CategoryId, Category>,
    products: DashMap<ProductId, ProductSlot>,
    /// Committed transactions in commit order, also the publication lock
    transactions: RwLock<Vec<Transaction>>,
    category_seq: AtomicI64,
    product_seq: AtomicI64,
    transaction_seq: AtomicI64,
    detail_seq: AtomicI64,
    lock_timeout: Duration,
}

impl Inner {
    async fn lock_row(&self, product_id: ProductId) -> StoreResult<Option<OwnedMutexGuard<()>>> {
        // The map reference must be released before awaiting the row lock
        let row_lock = match self.products.get(&product_id) {
            Some(slot) => Arc::clone(&slot.row_lock),
            None => return Ok(None),
        };

        let guard = tokio::time::timeout(self.lock_timeout, row_lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(product_id))?;

        // Deleted while we were waiting
        if !self.products.contains_key(&product_id) {
            return Ok(None);
        }

        Ok(Some(guard))
    }

    /// Borrow the referenced category; the entry cannot be removed while held
    fn category_ref(
        &self,
        category_id: Option<CategoryId>,
    ) -> StoreResult<Option<Ref<'_, CategoryId, Category>>> {
        let Some(id) = category_id else {
            return Ok(None);
        };

        self.categories
            .get(&id)
            .map(Some)
            .ok_or(StoreError::MissingReference {
                entity: "category",
                id,
            })
    }

    fn with_category_name(&self, mut product: Product) -> Product {
        product.category_name = product
            .category_id
            .and_then(|id| self.categories.get(&id).map(|c| c.name.clone()));
        product
    }
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst)
}

/// Embedded store shared by clones
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                categories: DashMap::new(),
                products: DashMap::new(),
                transactions: RwLock::new(Vec::new()),
                category_seq: AtomicI64::new(1),
                product_seq: AtomicI64::new(1),
                transaction_seq: AtomicI64::new(1),
                detail_seq: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    /// Committed stock of a product
    pub fn stock_of(&self, product_id: ProductId) -> Option<i64> {
        self.inner
            .products
            .get(&product_id)
            .map(|slot| slot.product.stock)
    }

    /// Number of committed transactions
    pub async fn transaction_count(&self) -> usize {
        self.inner.transactions.read().await.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Unit of work
// =========================================================================

/// Unit of work over the embedded store
pub struct MemoryScope {
    inner: Arc<Inner>,
    row_guards: HashMap<ProductId, OwnedMutexGuard<()>>,
    staged_stock: HashMap<ProductId, i64>,
    staged_transactions: Vec<Transaction>,
}

impl MemoryScope {
    fn staged_transaction(&mut self, id: TransactionId) -> Option<&mut Transaction> {
        self.staged_transactions.iter_mut().find(|t| t.id == id)
    }
}

impl std::fmt::Debug for MemoryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryScope")
            .field("locked_products", &self.row_guards.keys().collect::<Vec<_>>())
            .field("staged_stock", &self.staged_stock)
            .field("staged_transactions", &self.staged_transactions.len())
            .finish()
    }
}

#[async_trait]
impl UnitOfWork for MemoryScope {
    async fn commit(self) -> StoreResult<()> {
        let MemoryScope {
            inner,
            row_guards,
            staged_stock,
            staged_transactions,
        } = self;

        let mut ledger = inner.transactions.write().await;
        for (product_id, stock) in staged_stock {
            if let Some(mut slot) = inner.products.get_mut(&product_id) {
                slot.product.stock = stock;
            }
        }
        ledger.extend(staged_transactions);
        drop(ledger);

        // Row locks are released only after the new state is published
        drop(row_guards);
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ScopeFactory for MemoryStore {
    type Scope = MemoryScope;

    async fn begin_scope(&self) -> StoreResult<MemoryScope> {
        Ok(MemoryScope {
            inner: Arc::clone(&self.inner),
            row_guards: HashMap::new(),
            staged_stock: HashMap::new(),
            staged_transactions: Vec::new(),
        })
    }
}

// =========================================================================
// Inventory
// =========================================================================

#[async_trait]
impl InventoryStore<MemoryScope> for MemoryStore {
    async fn locked_read(
        &self,
        scope: &mut MemoryScope,
        product_id: ProductId,
    ) -> StoreResult<Option<LockedProduct>> {
        if !scope.row_guards.contains_key(&product_id) {
            match self.inner.lock_row(product_id).await? {
                Some(guard) => {
                    scope.row_guards.insert(product_id, guard);
                }
                None => return Ok(None),
            }
        }

        let Some(slot) = self.inner.products.get(&product_id) else {
            return Ok(None);
        };
        let stock = scope
            .staged_stock
            .get(&product_id)
            .copied()
            .unwrap_or(slot.product.stock);

        Ok(Some(LockedProduct {
            id: product_id,
            name: slot.product.name.clone(),
            price: slot.product.price,
            stock,
        }))
    }

    async fn decrement_stock(
        &self,
        scope: &mut MemoryScope,
        product_id: ProductId,
        amount: i64,
    ) -> StoreResult<()> {
        if !scope.row_guards.contains_key(&product_id) {
            return Err(StoreError::NotLocked(product_id));
        }

        let current = match scope.staged_stock.get(&product_id) {
            Some(stock) => *stock,
            None => self
                .stock_of(product_id)
                .ok_or(StoreError::NotLocked(product_id))?,
        };

        if amount < 0 || current < amount {
            return Err(StoreError::StockUnderflow { product_id, amount });
        }

        scope.staged_stock.insert(product_id, current - amount);
        Ok(())
    }
}

// =========================================================================
// Ledger
// =========================================================================

#[async_trait]
impl TransactionLedger<MemoryScope> for MemoryStore {
    async fn insert_header(
        &self,
        scope: &mut MemoryScope,
        total_amount: i64,
        created_at: DateTime<Utc>,
    ) -> StoreResult<TransactionId> {
        let id = next_id(&self.inner.transaction_seq);
        scope.staged_transactions.push(Transaction {
            id,
            total_amount,
            created_at,
            details: Vec::new(),
        });
        Ok(id)
    }

    async fn insert_detail(
        &self,
        scope: &mut MemoryScope,
        detail: &NewTransactionDetail,
    ) -> StoreResult<DetailId> {
        let transaction = scope
            .staged_transaction(detail.transaction_id)
            .ok_or(StoreError::MissingReference {
                entity: "transaction",
                id: detail.transaction_id,
            })?;

        let id = next_id(&self.inner.detail_seq);
        transaction
            .details
            .push(TransactionDetail::from_new(id, detail.clone()));
        Ok(id)
    }

    async fn find_all(&self) -> StoreResult<Vec<Transaction>> {
        let mut transactions = self.inner.transactions.read().await.clone();
        transactions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(transactions)
    }

    async fn find_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self
            .inner
            .transactions
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }
}

// =========================================================================
// Catalogue
// =========================================================================

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn find_all(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let _published = self.inner.transactions.read().await;

        let mut products: Vec<Product> = self
            .inner
            .products
            .iter()
            .map(|slot| slot.product.clone())
            .filter(|product| filter.matches(product))
            .collect();
        products.sort_by_key(|product| product.id);

        Ok(products
            .into_iter()
            .map(|product| self.inner.with_category_name(product))
            .collect())
    }

    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let _published = self.inner.transactions.read().await;

        let product = self.inner.products.get(&id).map(|slot| slot.product.clone());
        Ok(product.map(|product| self.inner.with_category_name(product)))
    }

    async fn create(&self, product: &NewProduct) -> StoreResult<Product> {
        let category = self.inner.category_ref(product.category_id)?;

        let id = next_id(&self.inner.product_seq);
        let mut created = Product {
            id,
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
            active: product.active,
            category_id: product.category_id,
            category_name: None,
        };
        self.inner.products.insert(
            id,
            ProductSlot {
                row_lock: Arc::new(Mutex::new(())),
                product: created.clone(),
            },
        );

        created.category_name = category.map(|c| c.name.clone());
        Ok(created)
    }

    async fn update(&self, id: ProductId, product: &NewProduct) -> StoreResult<Option<Product>> {
        let Some(_row_guard) = self.inner.lock_row(id).await? else {
            return Ok(None);
        };
        let category = self.inner.category_ref(product.category_id)?;

        let mut updated = match self.inner.products.get_mut(&id) {
            Some(mut slot) => {
                slot.product.name = product.name.clone();
                slot.product.price = product.price;
                slot.product.stock = product.stock;
                slot.product.active = product.active;
                slot.product.category_id = product.category_id;
                slot.product.clone()
            }
            None => return Ok(None),
        };

        updated.category_name = category.map(|c| c.name.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: ProductId) -> StoreResult<bool> {
        // Checkouts holding this row have committed or rolled back once we own it
        let Some(_row_guard) = self.inner.lock_row(id).await? else {
            return Ok(false);
        };

        let ledger = self.inner.transactions.read().await;
        let referenced = ledger
            .iter()
            .flat_map(|t| t.details.iter())
            .any(|d| d.product_id == id);
        if referenced {
            return Err(StoreError::Referenced {
                entity: "product",
                id,
            });
        }

        Ok(self.inner.products.remove(&id).is_some())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .inner
            .categories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        categories.sort_by_key(|category| category.id);
        Ok(categories)
    }

    async fn find_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.inner.categories.get(&id).map(|c| c.value().clone()))
    }

    async fn create(&self, category: &NewCategory) -> StoreResult<Category> {
        let id = next_id(&self.inner.category_seq);
        let created = Category {
            id,
            name: category.name.clone(),
            description: category.description.clone(),
        };
        self.inner.categories.insert(id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> StoreResult<Option<Category>> {
        Ok(self.inner.categories.get_mut(&id).map(|mut entry| {
            entry.name = category.name.clone();
            entry.description = category.description.clone();
            entry.clone()
        }))
    }

    async fn delete(&self, id: CategoryId) -> StoreResult<bool> {
        // The shard stays write-locked while products are scanned, so no
        // product can borrow this category in between
        let mut referenced = false;
        let removed = self.inner.categories.remove_if(&id, |_, _| {
            referenced = self
                .inner
                .products
                .iter()
                .any(|slot| slot.product.category_id == Some(id));
            !referenced
        });

        if referenced {
            return Err(StoreError::Referenced {
                entity: "category",
                id,
            });
        }

        Ok(removed.is_some())
    }
}
