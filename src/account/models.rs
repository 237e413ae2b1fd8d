//! Data models for users, companies and their membership

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A person that logs in and authenticates API calls.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The tenant: owns API keys, a plan assignment and the balance that
/// withdrawals are settled against.
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub company_id: i64,
    pub name: String,
    pub registration_number: String,
    pub address: String,
    pub subscription_id: Option<i64>,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCompany {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub registration_number: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
}

/// Which side of a user-company membership a query cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Any,
    VerifiedOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            user_id: 1,
            email: "a@example.com".to_string(),
            username: None,
            phone: None,
            password_hash: Some("$argon2id$secret".to_string()),
            email_verified: false,
            is_active: true,
            balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_new_company_validation() {
        let company = NewCompany {
            name: String::new(),
            registration_number: "RN-1".to_string(),
            address: "Main st".to_string(),
        };
        assert!(company.validate().is_err());
    }
}
