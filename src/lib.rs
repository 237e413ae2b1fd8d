//! payout_gateway - multi-tenant billing backend
//!
//! Merchants authenticate with an email plus API key, submit withdrawals
//! against a monthly request quota, and an operator settles confirmed
//! withdrawals by debiting the tenant balance atomically.
//!
//! # Modules
//!
//! - [`api_auth`] - Merchant credential check and API key management
//! - [`quota`] - Monthly usage counters and the plan-relative gate
//! - [`withdrawal`] - Withdrawal state machine and settlement
//! - [`invoice`] - Invoice records
//! - [`subscription`] - Plan catalog and plan changes
//! - [`account`] - Users, companies and memberships
//! - [`user_auth`] - Password login, JWT, email confirmation and reset
//! - [`reporting`] - Merchant totals and usage reports
//! - [`gateway`] - axum HTTP surface
//! - [`db`] / [`memory_store`] - PostgreSQL and in-process store backends

// Ambient
pub mod config;
pub mod logging;

// Storage
pub mod db;
pub mod memory_store;
pub mod token_store;

// Money
pub mod fee;
pub mod money;

// Domain
pub mod account;
pub mod api_auth;
pub mod invoice;
pub mod quota;
pub mod reporting;
pub mod subscription;
pub mod user_auth;
pub mod withdrawal;

// HTTP
pub mod gateway;

pub use config::{AppConfig, AuthConfig, BillingConfig};
pub use db::{Database, PgStore, StoreError};
pub use memory_store::MemoryStore;
