//! HTTP handlers, one module per API area

pub mod account;
pub mod auth;
pub mod health;
pub mod invoice;
pub mod keys;
pub mod operator;
pub mod statistics;
pub mod subscription;
pub mod withdrawal;

use super::error::{ApiError, ApiResult};
use crate::user_auth::Claims;

/// Numeric user id from a verified token.
fn claims_user_id(claims: &Claims) -> ApiResult<i64> {
    claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid user ID in token"))
}
