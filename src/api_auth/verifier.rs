//! Merchant credential verification
//!
//! `(auth_login, auth_secret)` resolves to the calling user and the company
//! the key belongs to. Read-only.

use std::sync::Arc;
use uuid::Uuid;

use super::error::VerifyError;
use super::models::{Credentials, VerifiedPrincipal};
use super::repository::ApiKeyStore;
use crate::account::AccountStore;

pub struct KeyVerifier {
    accounts: Arc<dyn AccountStore>,
    keys: Arc<dyn ApiKeyStore>,
}

impl KeyVerifier {
    pub fn new(accounts: Arc<dyn AccountStore>, keys: Arc<dyn ApiKeyStore>) -> Self {
        Self { accounts, keys }
    }

    /// Resolve credentials to a principal and its tenant.
    ///
    /// Every mismatch yields the same `InvalidCredentials`, so callers cannot
    /// tell an unknown login from a wrong key.
    pub async fn verify(&self, credentials: &Credentials) -> Result<VerifiedPrincipal, VerifyError> {
        let Ok(key) = Uuid::parse_str(credentials.auth_secret.trim()) else {
            return Err(VerifyError::InvalidCredentials);
        };

        let user = match self.accounts.user_by_email(&credentials.auth_login).await? {
            Some(user) if user.is_active => user,
            _ => return Err(VerifyError::InvalidCredentials),
        };

        let record = self
            .keys
            .find_active_key_for_user(user.user_id, key)
            .await?
            .ok_or(VerifyError::InvalidCredentials)?;

        let company = self
            .accounts
            .company_by_id(record.company_id)
            .await?
            .ok_or(VerifyError::InvalidCredentials)?;

        Ok(VerifiedPrincipal { user, company })
    }
}
