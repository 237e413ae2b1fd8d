//! Withdrawal request records and their public projections

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::types::{PayoutMethod, SubtractFrom, WithdrawalStatus};

/// A persisted withdrawal request. Never deleted; only `status` changes.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalRequest {
    pub request_id: Uuid,
    pub user_id: i64,
    pub company_id: i64,
    pub amount: Decimal,
    pub amount_currency: String,
    /// Currency of the payout rail
    pub currency: String,
    /// Fiat equivalent, filled in by operators when known
    pub rub_amount: Option<Decimal>,
    pub method: PayoutMethod,
    pub wallet: String,
    pub subtract_from: SubtractFrom,
    pub commission: Decimal,
    pub deduction_amount: Decimal,
    pub receive_amount: Decimal,
    pub callback_url: Option<String>,
    pub extra: Option<String>,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission as the client sent it. `amount` is the raw decimal string.
#[derive(Debug, Clone)]
pub struct WithdrawalDraft {
    pub amount: String,
    pub amount_currency: String,
    pub method: PayoutMethod,
    pub wallet: String,
    pub subtract_from: SubtractFrom,
    pub callback_url: Option<String>,
    pub extra: Option<String>,
}

/// Response body of a successful submission, also the callback payload.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalReceipt {
    pub status: WithdrawalStatus,
    pub id: Uuid,
    pub method: PayoutMethod,
    pub amount: Decimal,
    pub deduction_amount: Decimal,
    pub subtract_from: SubtractFrom,
    pub currency: String,
}

/// Full read projection for `info` and `history`.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalView {
    pub id: Uuid,
    pub status: WithdrawalStatus,
    pub method: PayoutMethod,
    pub amount: Decimal,
    pub amount_currency: String,
    pub currency: String,
    pub rub_amount: Option<Decimal>,
    pub commission: Decimal,
    pub deduction_amount: Decimal,
    pub receive_amount: Decimal,
    pub subtract_from: SubtractFrom,
    pub wallet: String,
    pub extra: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub fn receipt(&self) -> WithdrawalReceipt {
        WithdrawalReceipt {
            status: self.status,
            id: self.request_id,
            method: self.method,
            amount: self.amount,
            deduction_amount: self.deduction_amount,
            subtract_from: self.subtract_from,
            currency: self.currency.clone(),
        }
    }

    pub fn view(&self) -> WithdrawalView {
        WithdrawalView {
            id: self.request_id,
            status: self.status,
            method: self.method,
            amount: self.amount,
            amount_currency: self.amount_currency.clone(),
            currency: self.currency.clone(),
            rub_amount: self.rub_amount,
            commission: self.commission,
            deduction_amount: self.deduction_amount,
            receive_amount: self.receive_amount,
            subtract_from: self.subtract_from,
            wallet: self.wallet.clone(),
            extra: self.extra.clone(),
            created_at: self.created_at,
        }
    }
}
