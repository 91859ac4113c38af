//! Store Errors
//!
//! Error types for store operations.

use crate::domain::ProductId;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error (connectivity, constraint, deadlock, serialization)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stock mutation attempted without holding the row lock
    #[error("Product {0} is not locked by this unit of work")]
    NotLocked(ProductId),

    /// Decrement would leave stock negative
    #[error("Stock of product {product_id} cannot be decremented by {amount}")]
    StockUnderflow { product_id: ProductId, amount: i64 },

    /// Row lock could not be acquired in time
    #[error("Timed out waiting for lock on product {0}")]
    LockTimeout(ProductId),

    /// Row is still referenced by another record
    #[error("{entity} {id} is still referenced by other records")]
    Referenced { entity: &'static str, id: i64 },

    /// Row points at a record that does not exist
    #[error("Referenced {entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: i64 },
}
