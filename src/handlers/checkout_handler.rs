//! Checkout Handler
//!
//! Turns a cart into a persisted transaction while decrementing stock, as a
//! single unit of work.
//!
//! Product rows are locked in submission order and stay locked until the
//! scope commits or rolls back. Two checkouts touching the same product
//! therefore serialize on that row, while checkouts over disjoint products
//! run concurrently. Price and name are taken from the locked row, so the
//! persisted subtotal is exactly the price that passed the stock check.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::PgPool;

use crate::domain::{
    CheckoutError, CheckoutItem, NewTransactionDetail, ProductId, Transaction,
    TransactionDetail, TransactionId,
};
use crate::store::{
    InventoryStore, MemoryStore, PgInventoryStore, PgTransactionLedger, ScopeFactory,
    StoreResult, TransactionLedger, UnitOfWork,
};

use super::CheckoutCommand;

/// Line item priced under lock, not yet bound to a header
#[derive(Debug)]
struct PendingLine {
    product_id: ProductId,
    product_name: String,
    quantity: i64,
    subtotal: i64,
}

// =========================================================================
// CheckoutHandler
// =========================================================================

/// Handler for checkouts
///
/// Owns commit and rollback of the unit of work; the stores only ever act
/// inside the scope they are handed.
pub struct CheckoutHandler<U, I, L> {
    scopes: U,
    inventory: I,
    ledger: L,
}

pub type PgCheckoutHandler = CheckoutHandler<PgPool, PgInventoryStore, PgTransactionLedger>;

pub type MemoryCheckoutHandler = CheckoutHandler<MemoryStore, MemoryStore, MemoryStore>;

impl PgCheckoutHandler {
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(
            pool.clone(),
            PgInventoryStore::new(pool.clone()),
            PgTransactionLedger::new(pool),
        )
    }
}

impl MemoryCheckoutHandler {
    pub fn in_memory(store: MemoryStore) -> Self {
        Self::new(store.clone(), store.clone(), store)
    }
}

impl<U, I, L> CheckoutHandler<U, I, L>
where
    U: ScopeFactory,
    I: InventoryStore<U::Scope>,
    L: TransactionLedger<U::Scope>,
{
    pub fn new(scopes: U, inventory: I, ledger: L) -> Self {
        Self {
            scopes,
            inventory,
            ledger,
        }
    }

    /// Execute the checkout command
    pub async fn execute(&self, command: CheckoutCommand) -> Result<Transaction, CheckoutError> {
        command.validate()?;

        let mut scope = self.scopes.begin_scope().await?;

        match self.apply(&mut scope, &command.items).await {
            Ok(transaction) => {
                scope.commit().await?;

                tracing::info!(
                    transaction_id = transaction.id,
                    total_amount = transaction.total_amount,
                    lines = transaction.details.len(),
                    "Checkout committed"
                );

                Ok(transaction)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        "Checkout rollback failed"
                    );
                }

                if err.is_storage_failure() {
                    tracing::error!(error = %err, "Checkout aborted by storage failure");
                } else {
                    tracing::warn!(error = %err, "Checkout rejected");
                }

                Err(err)
            }
        }
    }

    /// List committed transactions, most recent first
    pub async fn transactions(&self) -> StoreResult<Vec<Transaction>> {
        self.ledger.find_all().await
    }

    /// Load one committed transaction
    pub async fn transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        self.ledger.find_by_id(id).await
    }

    /// Lock, check, price and decrement every line, then write the ledger rows
    async fn apply(
        &self,
        scope: &mut U::Scope,
        items: &[CheckoutItem],
    ) -> Result<Transaction, CheckoutError> {
        let mut lines = Vec::with_capacity(items.len());
        let mut total_amount: i64 = 0;

        for item in items {
            let product = self
                .inventory
                .locked_read(scope, item.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound {
                    product_id: item.product_id,
                })?;

            if product.stock < item.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }

            let subtotal = product.price.checked_mul(item.quantity);
            let running_total = subtotal.and_then(|s| total_amount.checked_add(s));
            let (Some(subtotal), Some(running_total)) = (subtotal, running_total) else {
                return Err(CheckoutError::AmountOverflow {
                    product_id: item.product_id,
                });
            };
            total_amount = running_total;

            self.inventory
                .decrement_stock(scope, item.product_id, item.quantity)
                .await?;

            lines.push(PendingLine {
                product_id: item.product_id,
                product_name: product.name,
                quantity: item.quantity,
                subtotal,
            });
        }

        if total_amount <= 0 {
            return Err(CheckoutError::EmptyOrder);
        }

        // Stored timestamps have microsecond precision
        let created_at = Utc::now().trunc_subsecs(6);
        let transaction_id = self
            .ledger
            .insert_header(scope, total_amount, created_at)
            .await?;

        let mut details = Vec::with_capacity(lines.len());
        for line in lines {
            let detail = NewTransactionDetail {
                transaction_id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                subtotal: line.subtotal,
            };
            let detail_id = self.ledger.insert_detail(scope, &detail).await?;
            details.push(TransactionDetail::from_new(detail_id, detail));
        }

        Ok(Transaction {
            id: transaction_id,
            total_amount,
            created_at,
            details,
        })
    }
}

// =========================================================================
// TransactionService
// =========================================================================

/// Object-safe face of the checkout handler used by the HTTP layer
#[async_trait]
pub trait TransactionService: Send + Sync {
    async fn checkout(&self, command: CheckoutCommand) -> Result<Transaction, CheckoutError>;

    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>>;

    async fn get_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;
}

#[async_trait]
impl<U, I, L> TransactionService for CheckoutHandler<U, I, L>
where
    U: ScopeFactory,
    I: InventoryStore<U::Scope>,
    L: TransactionLedger<U::Scope>,
{
    async fn checkout(&self, command: CheckoutCommand) -> Result<Transaction, CheckoutError> {
        self.execute(command).await
    }

    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>> {
        self.transactions().await
    }

    async fn get_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        self.transaction(id).await
    }
}
