use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};

use super::claims_user_id;
use super::super::error::ApiResult;
use super::super::state::AppState;
use super::super::types::Success;
use crate::api_auth::Credentials;
use crate::reporting::{GeneralStatistics, UsageReport};
use crate::user_auth::Claims;

/// POST /api/v1/statistics/general
pub async fn general_statistics(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Success<GeneralStatistics>>> {
    let Json(credentials) = payload?;
    let stats = state.reporting.general_statistics(&credentials).await?;
    Ok(Json(Success::new(stats)))
}

/// GET /api/v1/usage (JWT)
pub async fn usage_report(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Success<UsageReport>>> {
    let user_id = claims_user_id(&claims)?;
    Ok(Json(Success::new(state.reporting.usage_report(user_id).await?)))
}
