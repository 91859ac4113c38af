//! Product inventory on PostgreSQL

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{LockedProduct, NewProduct, Product, ProductFilter, ProductId};
use crate::store::{InventoryStore, ProductRepository, StoreError, StoreResult};

use super::{map_integrity_error, PgScope};

type ProductRow = (i64, String, i64, i64, bool, Option<i64>, Option<String>);

fn product_from_row(row: ProductRow) -> Product {
    let (id, name, price, stock, active, category_id, category_name) = row;
    Product {
        id,
        name,
        price,
        stock,
        active,
        category_id,
        category_name,
    }
}

/// Escape LIKE wildcards so user input matches literally
fn like_pattern(name: &str) -> String {
    let escaped = name
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Product table access
#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn missing_category(product: &NewProduct) -> StoreError {
        StoreError::MissingReference {
            entity: "category",
            id: product.category_id.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl InventoryStore<PgScope> for PgInventoryStore {
    async fn locked_read(
        &self,
        scope: &mut PgScope,
        product_id: ProductId,
    ) -> StoreResult<Option<LockedProduct>> {
        let row: Option<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT name, price, stock
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut **scope)
        .await?;

        Ok(row.map(|(name, price, stock)| LockedProduct {
            id: product_id,
            name,
            price,
            stock,
        }))
    }

    async fn decrement_stock(
        &self,
        scope: &mut PgScope,
        product_id: ProductId,
        amount: i64,
    ) -> StoreResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $1
            WHERE id = $2 AND stock >= $1
            "#,
        )
        .bind(amount)
        .bind(product_id)
        .execute(&mut **scope)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::StockUnderflow { product_id, amount });
        }

        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PgInventoryStore {
    async fn find_all(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let pattern = filter.name_pattern().map(|name| like_pattern(&name));

        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.price, p.stock, p.active, p.category_id, c.name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE ($1::text IS NULL OR LOWER(p.name) LIKE $1)
              AND ($2::bool IS NULL OR p.active = $2)
            ORDER BY p.id
            "#,
        )
        .bind(pattern)
        .bind(filter.active)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(product_from_row).collect())
    }

    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.price, p.stock, p.active, p.category_id, c.name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(product_from_row))
    }

    async fn create(&self, product: &NewProduct) -> StoreResult<Product> {
        let row: ProductRow = sqlx::query_as(
            r#"
            WITH inserted AS (
                INSERT INTO products (name, price, stock, active, category_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, name, price, stock, active, category_id
            )
            SELECT i.id, i.name, i.price, i.stock, i.active, i.category_id, c.name
            FROM inserted i
            LEFT JOIN categories c ON c.id = i.category_id
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.active)
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_integrity_error(e, Self::missing_category(product)))?;

        Ok(product_from_row(row))
    }

    async fn update(&self, id: ProductId, product: &NewProduct) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            WITH updated AS (
                UPDATE products
                SET name = $1,
                    price = $2,
                    stock = $3,
                    active = $4,
                    category_id = $5,
                    updated_at = NOW()
                WHERE id = $6
                RETURNING id, name, price, stock, active, category_id
            )
            SELECT u.id, u.name, u.price, u.stock, u.active, u.category_id, c.name
            FROM updated u
            LEFT JOIN categories c ON c.id = u.category_id
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.active)
        .bind(product.category_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_integrity_error(e, Self::missing_category(product)))?;

        Ok(row.map(product_from_row))
    }

    async fn delete(&self, id: ProductId) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_integrity_error(
                    e,
                    StoreError::Referenced {
                        entity: "product",
                        id,
                    },
                )
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
