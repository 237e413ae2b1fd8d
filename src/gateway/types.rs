//! Wire types of the HTTP surface
//!
//! Merchant requests carry `auth_login`/`auth_secret` in the body next to the
//! operation fields. Amounts arrive as decimal strings and go through the
//! strict money parser: invoice amounts here, withdrawal amounts inside the
//! service once the caller is known.

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::api_auth::Credentials;
use crate::invoice::InvoiceDraft;
use crate::money::{self, CRYPTO_SCALE};
use crate::withdrawal::{PayoutMethod, SubtractFrom, WithdrawalDraft};

// ============================================================================
// Responses
// ============================================================================

/// `{"status":"success","data":...}`
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// `{"status":"success","message":...}`
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

// ============================================================================
// Merchant API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitWithdrawalRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub amount: String,
    pub amount_currency: String,
    pub method: PayoutMethod,
    pub wallet: String,
    pub subtract_from: SubtractFrom,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

impl SubmitWithdrawalRequest {
    /// The amount stays a string until credentials and quota have been
    /// checked.
    pub fn into_parts(self) -> (Credentials, WithdrawalDraft) {
        let draft = WithdrawalDraft {
            amount: self.amount,
            amount_currency: self.amount_currency,
            method: self.method,
            wallet: self.wallet,
            subtract_from: self.subtract_from,
            callback_url: self.callback_url,
            extra: self.extra,
        };
        (self.credentials, draft)
    }
}

/// Credentials plus the id of a withdrawal request or invoice.
#[derive(Debug, Deserialize)]
pub struct RecordIdRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub amount: String,
    #[serde(default)]
    pub amount_currency: Option<String>,
    #[serde(default)]
    pub required_method: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
    #[serde(default)]
    pub payer_details: Option<String>,
    /// Seconds
    pub lifetime: i32,
}

impl CreateInvoiceRequest {
    pub fn into_parts(self) -> Result<(Credentials, InvoiceDraft), ApiError> {
        let amount = money::parse_amount(&self.amount, CRYPTO_SCALE)
            .map_err(|e| ApiError::bad_request(format!("amount: {}", e)))?;
        let draft = InvoiceDraft {
            amount,
            amount_currency: self.amount_currency,
            required_method: self.required_method,
            invoice_type: self.invoice_type,
            description: self.description,
            redirect_url: self.redirect_url,
            callback_url: self.callback_url,
            extra: self.extra,
            payer_details: self.payer_details,
            lifetime: self.lifetime,
        };
        Ok((self.credentials, draft))
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceCreated {
    pub id: uuid::Uuid,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub id: String,
}

// ============================================================================
// Account API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct KeyCheck {
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan_id: i64,
}
