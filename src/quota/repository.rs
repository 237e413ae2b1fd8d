//! Usage counter persistence
//!
//! One row per (owner, period), enforced by the primary key. Creation and
//! increment are single upserts so concurrent first access never duplicates.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgRow;

use super::period::PeriodKey;
use crate::db::{PgStore, SafeRow, StoreError};

/// Whose requests a counter tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum UsageOwner {
    User(i64),
    Company(i64),
}

impl UsageOwner {
    pub fn kind(&self) -> &'static str {
        match self {
            UsageOwner::User(_) => "user",
            UsageOwner::Company(_) => "company",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            UsageOwner::User(id) | UsageOwner::Company(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    pub owner: UsageOwner,
    pub period: PeriodKey,
    pub requests_made: i64,
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Existing counter, or a new one at zero.
    async fn get_or_create(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, StoreError>;

    /// Add one request to the counter, creating it if needed.
    async fn increment(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, StoreError>;

    /// All counters of an owner, newest period first.
    async fn list_counters(&self, owner: UsageOwner) -> Result<Vec<UsageCounter>, StoreError>;
}

fn row_to_counter(owner: UsageOwner, row: &PgRow) -> Result<UsageCounter, StoreError> {
    Ok(UsageCounter {
        owner,
        period: PeriodKey::from_date(row.col("period")?),
        requests_made: row.col("requests_made")?,
    })
}

#[async_trait]
impl UsageStore for PgStore {
    async fn get_or_create(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO usage_counters_tb (owner_kind, owner_id, period, requests_made)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (owner_kind, owner_id, period) DO NOTHING
            "#,
        )
        .bind(owner.kind())
        .bind(owner.id())
        .bind(period.date())
        .execute(self.pool())
        .await?;

        let row = sqlx::query(
            r#"
            SELECT period, requests_made FROM usage_counters_tb
            WHERE owner_kind = $1 AND owner_id = $2 AND period = $3
            "#,
        )
        .bind(owner.kind())
        .bind(owner.id())
        .bind(period.date())
        .fetch_one(self.pool())
        .await?;

        row_to_counter(owner, &row)
    }

    async fn increment(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO usage_counters_tb (owner_kind, owner_id, period, requests_made)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (owner_kind, owner_id, period)
            DO UPDATE SET requests_made = usage_counters_tb.requests_made + 1
            RETURNING period, requests_made
            "#,
        )
        .bind(owner.kind())
        .bind(owner.id())
        .bind(period.date())
        .fetch_one(self.pool())
        .await?;

        row_to_counter(owner, &row)
    }

    async fn list_counters(&self, owner: UsageOwner) -> Result<Vec<UsageCounter>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT period, requests_made FROM usage_counters_tb
            WHERE owner_kind = $1 AND owner_id = $2
            ORDER BY period DESC
            "#,
        )
        .bind(owner.kind())
        .bind(owner.id())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(|row| row_to_counter(owner, row)).collect()
    }
}
