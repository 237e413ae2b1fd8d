//! Merchant withdrawal endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::error::ApiResult;
use super::super::state::AppState;
use super::super::types::{RecordIdRequest, StatusMessage, SubmitWithdrawalRequest, Success};
use crate::api_auth::Credentials;
use crate::withdrawal::{WithdrawalReceipt, WithdrawalView};

/// POST /api/v1/payoff/withdraw
///
/// 201 with the receipt; the same receipt was already delivered to
/// `callback_url` when one was given.
pub async fn submit_withdrawal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitWithdrawalRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WithdrawalReceipt>)> {
    let Json(req) = payload?;
    let (credentials, draft) = req.into_parts();
    let request = state.withdrawals.submit(&credentials, draft).await?;
    Ok((StatusCode::CREATED, Json(request.receipt())))
}

/// POST /api/v1/payoff/confirm
pub async fn confirm_withdrawal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordIdRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let Json(req) = payload?;
    state.withdrawals.confirm(&req.credentials, &req.id).await?;
    Ok(Json(StatusMessage::success("Withdrawal request confirmed")))
}

/// POST /api/v1/payoff/cancel
pub async fn cancel_withdrawal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordIdRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let Json(req) = payload?;
    state.withdrawals.cancel(&req.credentials, &req.id).await?;
    Ok(Json(StatusMessage::success("Withdrawal request cancelled")))
}

/// POST /api/v1/payoff/info
pub async fn withdrawal_info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordIdRequest>, JsonRejection>,
) -> ApiResult<Json<Success<WithdrawalView>>> {
    let Json(req) = payload?;
    let request = state.withdrawals.get(&req.credentials, &req.id).await?;
    Ok(Json(Success::new(request.view())))
}

/// POST /api/v1/payoff/history
pub async fn withdrawal_history(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Success<Vec<WithdrawalView>>>> {
    let Json(credentials) = payload?;
    let requests = state.withdrawals.history(&credentials).await?;
    Ok(Json(Success::new(
        requests.iter().map(|r| r.view()).collect(),
    )))
}
