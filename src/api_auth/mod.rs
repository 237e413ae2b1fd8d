//! Merchant API credentials.
//!
//! Merchant calls authenticate with `auth_login` (account email) and
//! `auth_secret` (an API key UUID issued to one of the user's companies).
//!
//! ## Components
//! - `models`: credentials, key records, verified principal
//! - `error`: verification and key-management errors
//! - `repository`: `ApiKeyStore` trait and its PostgreSQL impl
//! - `verifier`: credential check used by every merchant operation
//! - `keys`: generate / check / regenerate / deactivate for logged-in users

pub mod error;
pub mod keys;
pub mod models;
pub mod repository;
pub mod verifier;

// Re-export for convenience
pub use error::{KeyError, VerifyError};
pub use keys::KeyService;
pub use models::{ApiKeyRecord, Credentials, VerifiedPrincipal};
pub use repository::ApiKeyStore;
pub use verifier::KeyVerifier;
