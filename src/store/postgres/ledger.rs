//! Transaction ledger on PostgreSQL

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    DetailId, NewTransactionDetail, Transaction, TransactionDetail, TransactionId,
};
use crate::store::{StoreResult, TransactionLedger};

use super::PgScope;

type HeaderRow = (i64, i64, DateTime<Utc>);
type DetailRow = (i64, i64, i64, String, i64, i64);

fn detail_from_row(row: DetailRow) -> TransactionDetail {
    let (id, transaction_id, product_id, product_name, quantity, subtotal) = row;
    TransactionDetail {
        id,
        transaction_id,
        product_id,
        product_name,
        quantity,
        subtotal,
    }
}

/// Transaction header and line item tables
#[derive(Debug, Clone)]
pub struct PgTransactionLedger {
    pool: PgPool,
}

impl PgTransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_details(
        &self,
        transaction_ids: &[TransactionId],
    ) -> StoreResult<Vec<TransactionDetail>> {
        let rows: Vec<DetailRow> = sqlx::query_as(
            r#"
            SELECT id, transaction_id, product_id, product_name, quantity, subtotal
            FROM transaction_details
            WHERE transaction_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(transaction_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(detail_from_row).collect())
    }
}

#[async_trait]
impl TransactionLedger<PgScope> for PgTransactionLedger {
    async fn insert_header(
        &self,
        scope: &mut PgScope,
        total_amount: i64,
        created_at: DateTime<Utc>,
    ) -> StoreResult<TransactionId> {
        let id: TransactionId = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (total_amount, created_at)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(total_amount)
        .bind(created_at)
        .fetch_one(&mut **scope)
        .await?;

        Ok(id)
    }

    async fn insert_detail(
        &self,
        scope: &mut PgScope,
        detail: &NewTransactionDetail,
    ) -> StoreResult<DetailId> {
        let id: DetailId = sqlx::query_scalar(
            r#"
            INSERT INTO transaction_details
                (transaction_id, product_id, product_name, quantity, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(detail.transaction_id)
        .bind(detail.product_id)
        .bind(&detail.product_name)
        .bind(detail.quantity)
        .bind(detail.subtotal)
        .fetch_one(&mut **scope)
        .await?;

        Ok(id)
    }

    async fn find_all(&self) -> StoreResult<Vec<Transaction>> {
        let headers: Vec<HeaderRow> = sqlx::query_as(
            r#"
            SELECT id, total_amount, created_at
            FROM transactions
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<TransactionId> = headers.iter().map(|(id, _, _)| *id).collect();
        let mut details_by_transaction: HashMap<TransactionId, Vec<TransactionDetail>> =
            HashMap::new();
        for detail in self.load_details(&ids).await? {
            details_by_transaction
                .entry(detail.transaction_id)
                .or_default()
                .push(detail);
        }

        Ok(headers
            .into_iter()
            .map(|(id, total_amount, created_at)| Transaction {
                id,
                total_amount,
                created_at,
                details: details_by_transaction.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    async fn find_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        let header: Option<HeaderRow> = sqlx::query_as(
            r#"
            SELECT id, total_amount, created_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, total_amount, created_at)) = header else {
            return Ok(None);
        };

        let details = self.load_details(&[id]).await?;

        Ok(Some(Transaction {
            id,
            total_amount,
            created_at,
            details,
        }))
    }
}
