//! API key models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::account::{Company, User};

/// Merchant credentials carried in the body of every merchant API call.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Account email of the authenticating user
    pub auth_login: String,
    /// Active API key of one of the user's companies
    pub auth_secret: String,
}

impl Credentials {
    pub fn new(auth_login: impl Into<String>, auth_secret: impl Into<String>) -> Self {
        Self {
            auth_login: auth_login.into(),
            auth_secret: auth_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_login", &self.auth_login)
            .field("auth_secret", &"***")
            .finish()
    }
}

/// API key record from database.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyRecord {
    pub key: Uuid,
    pub company_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful credential check: who called, and on whose behalf.
#[derive(Debug, Clone)]
pub struct VerifiedPrincipal {
    pub user: User,
    pub company: Company,
}

impl VerifiedPrincipal {
    pub fn user_id(&self) -> i64 {
        self.user.user_id
    }

    pub fn company_id(&self) -> i64 {
        self.company.company_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("merchant@example.com", "6f1c0b7e-secret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("merchant@example.com"));
        assert!(!printed.contains("6f1c0b7e"));
    }
}
