//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::handlers::{CheckoutHandler, TransactionService};
use crate::store::{
    CategoryRepository, MemoryStore, PgCategoryRepository, PgInventoryStore, ProductRepository,
};

/// Services handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<dyn TransactionService>,
    pub products: Arc<dyn ProductRepository>,
    pub categories: Arc<dyn CategoryRepository>,
}

impl AppState {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            transactions: Arc::new(CheckoutHandler::postgres(pool.clone())),
            products: Arc::new(PgInventoryStore::new(pool.clone())),
            categories: Arc::new(PgCategoryRepository::new(pool)),
        }
    }

    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            transactions: Arc::new(CheckoutHandler::in_memory(store.clone())),
            products: Arc::new(store.clone()),
            categories: Arc::new(store),
        }
    }
}
