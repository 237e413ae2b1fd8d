//! Invoice persistence

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::models::{Invoice, InvoiceStatus};
use crate::db::{PgStore, SafeRow, StoreError};

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError>;

    async fn invoice_for_user(
        &self,
        invoice_id: Uuid,
        user_id: i64,
    ) -> Result<Option<Invoice>, StoreError>;

    /// Newest first
    async fn invoices_for_user(&self, user_id: i64) -> Result<Vec<Invoice>, StoreError>;

    /// Overwrite the status of an invoice owned by `user_id`.
    async fn set_invoice_status(
        &self,
        invoice_id: Uuid,
        user_id: i64,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, StoreError>;

    async fn total_invoiced(&self, user_id: i64) -> Result<Decimal, StoreError>;
}

const COLUMNS: &str = "invoice_id, user_id, amount, amount_currency, required_method, \
                       invoice_type, description, redirect_url, callback_url, extra, \
                       payer_details, lifetime, status, created_at";

fn row_to_invoice(row: &PgRow) -> Result<Invoice, StoreError> {
    Ok(Invoice {
        id: row.col("invoice_id")?,
        user_id: row.col("user_id")?,
        amount: row.col("amount")?,
        amount_currency: row.col("amount_currency")?,
        required_method: row.col("required_method")?,
        invoice_type: row.col("invoice_type")?,
        description: row.col("description")?,
        redirect_url: row.col("redirect_url")?,
        callback_url: row.col("callback_url")?,
        extra: row.col("extra")?,
        payer_details: row.col("payer_details")?,
        lifetime: row.col("lifetime")?,
        status: row.parsed("status")?,
        created_at: row.col("created_at")?,
    })
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO invoices_tb ({cols}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {cols}",
            cols = COLUMNS
        ))
        .bind(invoice.id)
        .bind(invoice.user_id)
        .bind(invoice.amount)
        .bind(&invoice.amount_currency)
        .bind(&invoice.required_method)
        .bind(&invoice.invoice_type)
        .bind(&invoice.description)
        .bind(&invoice.redirect_url)
        .bind(&invoice.callback_url)
        .bind(&invoice.extra)
        .bind(&invoice.payer_details)
        .bind(invoice.lifetime)
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;

        row_to_invoice(&row)
    }

    async fn invoice_for_user(
        &self,
        invoice_id: Uuid,
        user_id: i64,
    ) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invoices_tb WHERE invoice_id = $1 AND user_id = $2",
            COLUMNS
        ))
        .bind(invoice_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_invoice).transpose()
    }

    async fn invoices_for_user(&self, user_id: i64) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM invoices_tb WHERE user_id = $1 ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_invoice).collect()
    }

    async fn set_invoice_status(
        &self,
        invoice_id: Uuid,
        user_id: i64,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE invoices_tb SET status = $3 WHERE invoice_id = $1 AND user_id = $2 \
             RETURNING {}",
            COLUMNS
        ))
        .bind(invoice_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_invoice).transpose()
    }

    async fn total_invoiced(&self, user_id: i64) -> Result<Decimal, StoreError> {
        let total: Option<Decimal> =
            sqlx::query_scalar("SELECT SUM(amount) FROM invoices_tb WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool())
                .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}
