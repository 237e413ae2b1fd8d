//! Withdrawal persistence and atomic settlement
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::models::WithdrawalRequest;
use super::types::WithdrawalStatus;
use crate::db::{PgStore, SafeRow, StoreError};

/// An inserted but not yet committed request.
///
/// Dropping it without `commit` discards the row.
#[async_trait]
pub trait PendingWithdrawal: Send {
    fn request(&self) -> &WithdrawalRequest;

    async fn commit(self: Box<Self>) -> Result<WithdrawalRequest, StoreError>;
}

/// Result of a compare-and-set status change.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(WithdrawalRequest),
    NotFound,
    /// The request exists but is not in the expected state
    Rejected(WithdrawalStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    Settled {
        request: WithdrawalRequest,
        balance_after: Decimal,
    },
    NotFound,
    InvalidState(WithdrawalStatus),
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn begin_insert(
        &self,
        request: WithdrawalRequest,
    ) -> Result<Box<dyn PendingWithdrawal>, StoreError>;

    async fn get(&self, request_id: Uuid) -> Result<Option<WithdrawalRequest>, StoreError>;

    /// Lookup scoped to the owning tenant.
    async fn get_for_company(
        &self,
        request_id: Uuid,
        company_id: i64,
    ) -> Result<Option<WithdrawalRequest>, StoreError>;

    /// Move `from -> to` only if the request belongs to `company_id` and is
    /// still in `from`.
    async fn transition(
        &self,
        request_id: Uuid,
        company_id: i64,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Debit the owning company by `deduction_amount` and mark the request
    /// payed, in one atomic unit. Requires status `processing`.
    async fn settle(&self, request_id: Uuid) -> Result<SettleOutcome, StoreError>;

    /// Newest first
    async fn list_for_company(&self, company_id: i64)
    -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// Sum of `amount` over payed requests of the company.
    async fn total_payed(&self, company_id: i64) -> Result<Decimal, StoreError>;
}

const COLUMNS: &str = "request_id, user_id, company_id, amount, amount_currency, currency, \
                       rub_amount, method, wallet, subtract_from, commission, deduction_amount, \
                       receive_amount, callback_url, extra, status, created_at, updated_at";

fn row_to_request(row: &PgRow) -> Result<WithdrawalRequest, StoreError> {
    Ok(WithdrawalRequest {
        request_id: row.col("request_id")?,
        user_id: row.col("user_id")?,
        company_id: row.col("company_id")?,
        amount: row.col("amount")?,
        amount_currency: row.col("amount_currency")?,
        currency: row.col("currency")?,
        rub_amount: row.col("rub_amount")?,
        method: row.parsed("method")?,
        wallet: row.col("wallet")?,
        subtract_from: row.parsed("subtract_from")?,
        commission: row.col("commission")?,
        deduction_amount: row.col("deduction_amount")?,
        receive_amount: row.col("receive_amount")?,
        callback_url: row.col("callback_url")?,
        extra: row.col("extra")?,
        status: row.parsed("status")?,
        created_at: row.col("created_at")?,
        updated_at: row.col("updated_at")?,
    })
}

struct PgPendingWithdrawal {
    tx: Transaction<'static, Postgres>,
    request: WithdrawalRequest,
}

#[async_trait]
impl PendingWithdrawal for PgPendingWithdrawal {
    fn request(&self) -> &WithdrawalRequest {
        &self.request
    }

    async fn commit(self: Box<Self>) -> Result<WithdrawalRequest, StoreError> {
        let PgPendingWithdrawal { tx, request } = *self;
        tx.commit().await?;
        Ok(request)
    }
}

#[async_trait]
impl WithdrawalStore for PgStore {
    async fn begin_insert(
        &self,
        request: WithdrawalRequest,
    ) -> Result<Box<dyn PendingWithdrawal>, StoreError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO withdrawal_requests_tb ({cols}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {cols}",
            cols = COLUMNS
        ))
        .bind(request.request_id)
        .bind(request.user_id)
        .bind(request.company_id)
        .bind(request.amount)
        .bind(&request.amount_currency)
        .bind(&request.currency)
        .bind(request.rub_amount)
        .bind(request.method.as_str())
        .bind(&request.wallet)
        .bind(request.subtract_from.as_str())
        .bind(request.commission)
        .bind(request.deduction_amount)
        .bind(request.receive_amount)
        .bind(&request.callback_url)
        .bind(&request.extra)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;
        let request = row_to_request(&row)?;

        Ok(Box::new(PgPendingWithdrawal { tx, request }))
    }

    async fn get(&self, request_id: Uuid) -> Result<Option<WithdrawalRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM withdrawal_requests_tb WHERE request_id = $1",
            COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn get_for_company(
        &self,
        request_id: Uuid,
        company_id: i64,
    ) -> Result<Option<WithdrawalRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM withdrawal_requests_tb WHERE request_id = $1 AND company_id = $2",
            COLUMNS
        ))
        .bind(request_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn transition(
        &self,
        request_id: Uuid,
        company_id: i64,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<TransitionOutcome, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE withdrawal_requests_tb SET status = $4, updated_at = NOW() \
             WHERE request_id = $1 AND company_id = $2 AND status = $3 \
             RETURNING {}",
            COLUMNS
        ))
        .bind(request_id)
        .bind(company_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(self.pool())
        .await?;

        if let Some(row) = row {
            return Ok(TransitionOutcome::Applied(row_to_request(&row)?));
        }

        Ok(match self.get_for_company(request_id, company_id).await? {
            Some(current) => TransitionOutcome::Rejected(current.status),
            None => TransitionOutcome::NotFound,
        })
    }

    async fn settle(&self, request_id: Uuid) -> Result<SettleOutcome, StoreError> {
        let mut tx = self.pool().begin().await?;

        // Lock the request first, then the balance row
        let row = sqlx::query(
            r#"
            SELECT company_id, status, deduction_amount
            FROM withdrawal_requests_tb
            WHERE request_id = $1
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(SettleOutcome::NotFound);
        };
        let company_id: i64 = row.col("company_id")?;
        let status: WithdrawalStatus = row.parsed("status")?;
        let required: Decimal = row.col("deduction_amount")?;

        if status != WithdrawalStatus::Processing {
            return Ok(SettleOutcome::InvalidState(status));
        }

        let available: Decimal = sqlx::query_scalar(
            "SELECT balance FROM companies_tb WHERE company_id = $1 FOR UPDATE",
        )
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;

        if available < required {
            // tx dropped here: rollback, nothing written
            return Ok(SettleOutcome::InsufficientBalance {
                required,
                available,
            });
        }

        let balance_after: Decimal = sqlx::query_scalar(
            r#"
            UPDATE companies_tb
            SET balance = balance - $2
            WHERE company_id = $1
            RETURNING balance
            "#,
        )
        .bind(company_id)
        .bind(required)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "UPDATE withdrawal_requests_tb SET status = $2, updated_at = NOW() \
             WHERE request_id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(request_id)
        .bind(WithdrawalStatus::Payed.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let request = row_to_request(&row)?;

        tx.commit().await?;

        Ok(SettleOutcome::Settled {
            request,
            balance_after,
        })
    }

    async fn list_for_company(
        &self,
        company_id: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM withdrawal_requests_tb WHERE company_id = $1 \
             ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_request).collect()
    }

    async fn total_payed(&self, company_id: i64) -> Result<Decimal, StoreError> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM withdrawal_requests_tb WHERE company_id = $1 AND status = $2",
        )
        .bind(company_id)
        .bind(WithdrawalStatus::Payed.as_str())
        .fetch_one(self.pool())
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }
}
