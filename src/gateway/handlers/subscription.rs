//! Plan catalog and plan changes
//!
//! Reads and plan changes take a bearer token; catalog writes are
//! operator-only.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::error::ApiResult;
use super::super::state::AppState;
use super::super::types::{ChangePlanRequest, StatusMessage, Success};
use super::claims_user_id;
use crate::subscription::{PlanInput, SubscriptionHistory, SubscriptionPlan};
use crate::user_auth::Claims;

/// GET /api/v1/subscriptions
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Success<Vec<SubscriptionPlan>>>> {
    Ok(Json(Success::new(state.subscriptions.list().await?)))
}

/// POST /api/v1/subscriptions
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlanInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Success<SubscriptionPlan>>)> {
    let Json(input) = payload?;
    let plan = state.subscriptions.create(input).await?;
    Ok((StatusCode::CREATED, Json(Success::new(plan))))
}

/// GET /api/v1/subscriptions/{id}
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(plan_id): Path<i64>,
) -> ApiResult<Json<Success<SubscriptionPlan>>> {
    Ok(Json(Success::new(state.subscriptions.get(plan_id).await?)))
}

/// PUT /api/v1/subscriptions/{id}
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(plan_id): Path<i64>,
    payload: Result<Json<PlanInput>, JsonRejection>,
) -> ApiResult<Json<Success<SubscriptionPlan>>> {
    let Json(input) = payload?;
    let plan = state.subscriptions.update(plan_id, input).await?;
    Ok(Json(Success::new(plan)))
}

/// DELETE /api/v1/subscriptions/{id}
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(plan_id): Path<i64>,
) -> ApiResult<Json<StatusMessage>> {
    state.subscriptions.delete(plan_id).await?;
    Ok(Json(StatusMessage::success("Subscription plan deleted")))
}

/// POST /api/v1/companies/{id}/subscription
pub async fn change_plan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
    payload: Result<Json<ChangePlanRequest>, JsonRejection>,
) -> ApiResult<Json<Success<SubscriptionHistory>>> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    let entry = state
        .subscriptions
        .change_plan(user_id, company_id, req.plan_id)
        .await?;
    Ok(Json(Success::new(entry)))
}

/// GET /api/v1/subscription-history
pub async fn subscription_history(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Success<Vec<SubscriptionHistory>>>> {
    let user_id = claims_user_id(&claims)?;
    Ok(Json(Success::new(
        state.subscriptions.history(user_id).await?,
    )))
}
