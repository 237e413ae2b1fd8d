//! Operator-only endpoints
//!
//! Everything here sits behind `operator_auth_middleware`: settlement and
//! plan catalog changes.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use super::super::types::{SettleRequest, Success};
use crate::withdrawal::WithdrawalView;

pub const OPERATOR_SECRET_HEADER: &str = "x-operator-secret";

/// Shared-secret guard. Closed when no secret is configured.
pub async fn operator_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    check_operator_secret(state.operator_secret.as_deref(), request.headers())?;
    Ok(next.run(request).await)
}

fn check_operator_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Err(ApiError::forbidden("Operator access is disabled"));
    };
    let provided = headers
        .get(OPERATOR_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !bool::from(provided.ct_eq(expected.as_bytes())) {
        warn!("Operator request rejected: bad secret");
        return Err(ApiError::forbidden("Invalid operator secret"));
    }
    Ok(())
}

/// POST /internal/payoff/settle
///
/// Debits the tenant balance and marks a processing request payed.
pub async fn settle_withdrawal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SettleRequest>, JsonRejection>,
) -> ApiResult<Json<Success<WithdrawalView>>> {
    let Json(req) = payload?;
    let request = state.withdrawals.settle(&req.id).await?;
    Ok(Json(Success::new(request.view())))
}
