//! Withdrawal error types

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::WithdrawalStatus;
use crate::api_auth::VerifyError;
use crate::db::StoreError;
use crate::quota::QuotaError;

#[derive(Debug, Error)]
pub enum WithdrawalError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Request limit reached for this month")]
    QuotaExceeded,

    /// Unknown id and another tenant's id look the same
    #[error("Withdrawal request not found")]
    NotFound,

    #[error("Withdrawal request cannot be {action}")]
    InvalidTransition {
        action: &'static str,
        status: WithdrawalStatus,
    },

    #[error("Insufficient balance")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Callback request failed: {0}")]
    CallbackDeliveryFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<VerifyError> for WithdrawalError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidCredentials => WithdrawalError::Unauthorized,
            VerifyError::Storage(e) => WithdrawalError::Storage(e),
        }
    }
}

impl From<QuotaError> for WithdrawalError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::Exceeded => WithdrawalError::QuotaExceeded,
            QuotaError::Storage(e) => WithdrawalError::Storage(e),
            other => WithdrawalError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages() {
        assert_eq!(
            WithdrawalError::InvalidTransition {
                action: "confirmed",
                status: WithdrawalStatus::Processing,
            }
            .to_string(),
            "Withdrawal request cannot be confirmed"
        );
        assert_eq!(
            WithdrawalError::QuotaExceeded.to_string(),
            "Request limit reached for this month"
        );
        assert_eq!(
            WithdrawalError::from(VerifyError::InvalidCredentials).to_string(),
            "Invalid credentials"
        );
    }
}
