//! Categories on PostgreSQL

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Category, CategoryId, NewCategory};
use crate::store::{CategoryRepository, StoreError, StoreResult};

use super::map_integrity_error;

type CategoryRow = (i64, String, String);

fn category_from_row((id, name, description): CategoryRow) -> Category {
    Category {
        id,
        name,
        description,
    }
}

#[derive(Debug, Clone)]
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_all(&self) -> StoreResult<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(category_from_row).collect())
    }

    async fn find_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(category_from_row))
    }

    async fn create(&self, category: &NewCategory) -> StoreResult<Category> {
        let row: CategoryRow = sqlx::query_as(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(category_from_row(row))
    }

    async fn update(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            r#"
            UPDATE categories
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, name, description
            "#,
        )
        .bind(&category.name)
        .bind(&category.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(category_from_row))
    }

    async fn delete(&self, id: CategoryId) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_integrity_error(
                    e,
                    StoreError::Referenced {
                        entity: "category",
                        id,
                    },
                )
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
