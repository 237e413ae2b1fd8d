//! API key management for logged-in users (JWT)

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::error::ApiResult;
use super::super::state::AppState;
use super::super::types::{GenerateKeyRequest, KeyCheck, KeyRequest, StatusMessage, Success};
use super::claims_user_id;
use crate::api_auth::ApiKeyRecord;
use crate::user_auth::Claims;

/// POST /api/v1/keys/generate
pub async fn generate_key(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<GenerateKeyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Success<ApiKeyRecord>>)> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    let record = state.keys.generate(user_id, &req.company_name).await?;
    Ok((StatusCode::CREATED, Json(Success::new(record))))
}

/// POST /api/v1/keys/check
pub async fn check_key(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> ApiResult<Json<Success<KeyCheck>>> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    let valid = state.keys.check(user_id, &req.key).await?;
    Ok(Json(Success::new(KeyCheck { valid })))
}

/// POST /api/v1/keys/regenerate
pub async fn regenerate_key(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> ApiResult<Json<Success<ApiKeyRecord>>> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    let record = state.keys.regenerate(user_id, &req.key).await?;
    Ok(Json(Success::new(record)))
}

/// POST /api/v1/keys/deactivate
pub async fn deactivate_key(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    state.keys.deactivate(user_id, &req.key).await?;
    Ok(Json(StatusMessage::success("API key deactivated")))
}
