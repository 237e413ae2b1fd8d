//! Plan catalog persistence

use async_trait::async_trait;
use sqlx::postgres::PgRow;

use super::models::{PlanInput, SubscriptionHistory, SubscriptionPlan};
use crate::db::{PgStore, SafeRow, StoreError};

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn create_plan(&self, input: PlanInput) -> Result<SubscriptionPlan, StoreError>;

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, StoreError>;

    async fn get_plan(&self, plan_id: i64) -> Result<Option<SubscriptionPlan>, StoreError>;

    async fn update_plan(
        &self,
        plan_id: i64,
        input: PlanInput,
    ) -> Result<Option<SubscriptionPlan>, StoreError>;

    /// Fails with `StoreError::InUse` while a company references the plan.
    async fn delete_plan(&self, plan_id: i64) -> Result<bool, StoreError>;

    /// Point the company at the plan and append a history entry, atomically.
    /// `None` if either the plan or the company does not exist.
    async fn assign_plan(
        &self,
        user_id: i64,
        company_id: i64,
        plan_id: i64,
    ) -> Result<Option<SubscriptionHistory>, StoreError>;

    /// Newest first
    async fn history_for_user(&self, user_id: i64) -> Result<Vec<SubscriptionHistory>, StoreError>;
}

fn row_to_plan(row: &PgRow) -> Result<SubscriptionPlan, StoreError> {
    Ok(SubscriptionPlan {
        plan_id: row.col("plan_id")?,
        name: row.parsed("name")?,
        max_requests_per_month: row.col("max_requests_per_month")?,
        price: row.col("price")?,
        created_at: row.col("created_at")?,
    })
}

fn row_to_history(row: &PgRow) -> Result<SubscriptionHistory, StoreError> {
    Ok(SubscriptionHistory {
        history_id: row.col("history_id")?,
        user_id: row.col("user_id")?,
        company_id: row.col("company_id")?,
        plan_id: row.col("plan_id")?,
        amount: row.col("amount")?,
        date: row.col("date")?,
    })
}

const PLAN_COLUMNS: &str = "plan_id, name, max_requests_per_month, price, created_at";

#[async_trait]
impl PlanStore for PgStore {
    async fn create_plan(&self, input: PlanInput) -> Result<SubscriptionPlan, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO subscription_plans_tb (name, max_requests_per_month, price) \
             VALUES ($1, $2, $3) RETURNING {}",
            PLAN_COLUMNS
        ))
        .bind(input.name.as_str())
        .bind(input.max_requests_per_month)
        .bind(input.price)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;

        row_to_plan(&row)
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans_tb ORDER BY plan_id",
            PLAN_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_plan).collect()
    }

    async fn get_plan(&self, plan_id: i64) -> Result<Option<SubscriptionPlan>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans_tb WHERE plan_id = $1",
            PLAN_COLUMNS
        ))
        .bind(plan_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_plan).transpose()
    }

    async fn update_plan(
        &self,
        plan_id: i64,
        input: PlanInput,
    ) -> Result<Option<SubscriptionPlan>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE subscription_plans_tb \
             SET name = $2, max_requests_per_month = $3, price = $4 \
             WHERE plan_id = $1 RETURNING {}",
            PLAN_COLUMNS
        ))
        .bind(plan_id)
        .bind(input.name.as_str())
        .bind(input.max_requests_per_month)
        .bind(input.price)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_plan).transpose()
    }

    async fn delete_plan(&self, plan_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscription_plans_tb WHERE plan_id = $1")
            .bind(plan_id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_plan(
        &self,
        user_id: i64,
        company_id: i64,
        plan_id: i64,
    ) -> Result<Option<SubscriptionHistory>, StoreError> {
        let mut tx = self.pool().begin().await?;

        let price: Option<rust_decimal::Decimal> =
            sqlx::query_scalar("SELECT price FROM subscription_plans_tb WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(price) = price else {
            return Ok(None);
        };

        let updated = sqlx::query("UPDATE companies_tb SET subscription_id = $2 WHERE company_id = $1")
            .bind(company_id)
            .bind(plan_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO subscription_history_tb (user_id, company_id, plan_id, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING history_id, user_id, company_id, plan_id, amount, date
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(plan_id)
        .bind(price)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;
        let entry = row_to_history(&row)?;

        tx.commit().await?;
        Ok(Some(entry))
    }

    async fn history_for_user(&self, user_id: i64) -> Result<Vec<SubscriptionHistory>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT history_id, user_id, company_id, plan_id, amount, date
            FROM subscription_history_tb
            WHERE user_id = $1
            ORDER BY date DESC, history_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_history).collect()
    }
}
