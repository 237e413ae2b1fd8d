//! API Key repository for database operations.
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::models::ApiKeyRecord;
use crate::db::{PgStore, SafeRow, StoreError};

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Active key bound to a company the user belongs to.
    async fn find_active_key_for_user(
        &self,
        user_id: i64,
        key: Uuid,
    ) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Like `find_active_key_for_user` but ignores the active flag.
    async fn find_key_for_user(
        &self,
        user_id: i64,
        key: Uuid,
    ) -> Result<Option<ApiKeyRecord>, StoreError>;

    async fn insert_key(&self, company_id: i64, key: Uuid) -> Result<ApiKeyRecord, StoreError>;

    /// Returns false if the key was unknown or already inactive.
    async fn deactivate_key(&self, key: Uuid) -> Result<bool, StoreError>;

    /// Deactivate `old` and issue `new` for the same company, atomically.
    /// `None` if `old` is not an active key.
    async fn rotate_key(&self, old: Uuid, new: Uuid) -> Result<Option<ApiKeyRecord>, StoreError>;
}

fn row_to_record(row: &PgRow) -> Result<ApiKeyRecord, StoreError> {
    Ok(ApiKeyRecord {
        key: row.col("api_key")?,
        company_id: row.col("company_id")?,
        is_active: row.col("is_active")?,
        created_at: row.col("created_at")?,
    })
}

#[async_trait]
impl ApiKeyStore for PgStore {
    async fn find_active_key_for_user(
        &self,
        user_id: i64,
        key: Uuid,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        Ok(self
            .find_key_for_user(user_id, key)
            .await?
            .filter(|record| record.is_active))
    }

    async fn find_key_for_user(
        &self,
        user_id: i64,
        key: Uuid,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT k.api_key, k.company_id, k.is_active, k.created_at
            FROM api_keys_tb k
            JOIN user_company_tb uc ON uc.company_id = k.company_id
            WHERE k.api_key = $1 AND uc.user_id = $2
            LIMIT 1
            "#,
        )
        .bind(key)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert_key(&self, company_id: i64, key: Uuid) -> Result<ApiKeyRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO api_keys_tb (api_key, company_id, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING api_key, company_id, is_active, created_at
            "#,
        )
        .bind(key)
        .bind(company_id)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;

        row_to_record(&row)
    }

    async fn deactivate_key(&self, key: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE api_keys_tb SET is_active = FALSE WHERE api_key = $1 AND is_active",
        )
        .bind(key)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rotate_key(&self, old: Uuid, new: Uuid) -> Result<Option<ApiKeyRecord>, StoreError> {
        let mut tx = self.pool().begin().await?;

        let company_id: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE api_keys_tb SET is_active = FALSE
            WHERE api_key = $1 AND is_active
            RETURNING company_id
            "#,
        )
        .bind(old)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(company_id) = company_id else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            INSERT INTO api_keys_tb (api_key, company_id, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING api_key, company_id, is_active, created_at
            "#,
        )
        .bind(new)
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;
        let record = row_to_record(&row)?;

        tx.commit().await?;
        Ok(Some(record))
    }
}
