//! PostgreSQL stores
//!
//! The unit of work is a `sqlx` transaction; row locks are taken with
//! `SELECT ... FOR UPDATE` and released on commit or rollback.

mod category;
mod inventory;
mod ledger;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{ScopeFactory, StoreError, StoreResult, UnitOfWork};

pub use category::PgCategoryRepository;
pub use inventory::PgInventoryStore;
pub use ledger::PgTransactionLedger;

/// Unit of work backed by a database transaction
pub type PgScope = Transaction<'static, Postgres>;

const FOREIGN_KEY_VIOLATION: &str = "23503";

#[async_trait]
impl UnitOfWork for PgScope {
    async fn commit(self) -> StoreResult<()> {
        Transaction::commit(self).await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Transaction::rollback(self).await?;
        Ok(())
    }
}

#[async_trait]
impl ScopeFactory for PgPool {
    type Scope = PgScope;

    async fn begin_scope(&self) -> StoreResult<PgScope> {
        Ok(self.begin().await?)
    }
}

/// Check if a database error is a foreign key violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map_or(false, |code| code == FOREIGN_KEY_VIOLATION)
}

/// Map a foreign key violation to an integrity error, pass anything else through
pub(crate) fn map_integrity_error(err: sqlx::Error, integrity: StoreError) -> StoreError {
    if is_foreign_key_violation(&err) {
        integrity
    } else {
        StoreError::Database(err)
    }
}
