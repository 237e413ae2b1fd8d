//! Credential and key-management error types.

use thiserror::Error;

use crate::db::StoreError;

/// Failure of the merchant credential check.
///
/// Unknown login, wrong key, revoked key and key of an unrelated company all
/// collapse into `InvalidCredentials`.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Failures of key management by a logged-in user.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Company not found")]
    CompanyNotFound,

    #[error("API key not found")]
    KeyNotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(
            VerifyError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
    }
}
