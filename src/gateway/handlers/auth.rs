//! Registration, login and password flows

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Redirect,
};
use serde::Serialize;

use super::super::error::ApiResult;
use super::super::state::AppState;
use super::super::types::{ChangePasswordRequest, EmailRequest, NewPasswordRequest, StatusMessage};
use super::claims_user_id;
use crate::user_auth::{AuthResponse, Claims, LoginRequest, RegisterRequest};

#[derive(Debug, Serialize)]
pub struct Registered {
    pub user_id: i64,
    pub email: String,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Registered>)> {
    let Json(req) = payload?;
    let user = state.user_auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            user_id: user.user_id,
            email: user.email,
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    Ok(Json(state.user_auth.login(req).await?))
}

/// POST /api/v1/auth/start-registration
pub async fn start_registration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let Json(req) = payload?;
    state.user_auth.start_registration(&req.email).await?;
    Ok(Json(StatusMessage::success(
        "Confirmation link has been sent to your email.",
    )))
}

/// GET /api/v1/auth/confirm-registration/{token}
///
/// Always redirects to the frontend, on the error page when the link is stale.
pub async fn confirm_registration(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult<Redirect> {
    let target = state.user_auth.confirm_registration(&token).await?;
    Ok(Redirect::to(&target))
}

/// POST /api/v1/auth/send-reset-email
pub async fn send_reset_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let Json(req) = payload?;
    state.user_auth.send_reset_email(&req.email).await?;
    Ok(Json(StatusMessage::success(
        "Password reset link has been sent to your email.",
    )))
}

/// POST /api/v1/auth/reset-password/{token}
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    payload: Result<Json<NewPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let Json(req) = payload?;
    state.user_auth.reset_password(&token, &req.password).await?;
    Ok(Json(StatusMessage::success("Password has been reset.")))
}

/// POST /api/v1/auth/change-password (JWT)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    state
        .user_auth
        .change_password(user_id, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(StatusMessage::success("Password changed.")))
}

/// POST /api/v1/auth/change-email (JWT)
pub async fn change_email(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let user_id = claims_user_id(&claims)?;
    let Json(req) = payload?;
    state.user_auth.start_email_change(user_id, &req.email).await?;
    Ok(Json(StatusMessage::success(
        "A confirmation email has been sent. Please check your inbox.",
    )))
}

/// POST /api/v1/auth/confirm-email/{token} (JWT)
pub async fn confirm_email_change(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(token): Path<String>,
) -> ApiResult<Json<AuthResponse>> {
    let user_id = claims_user_id(&claims)?;
    let auth = state.user_auth.confirm_email_change(user_id, &token).await?;
    Ok(Json(auth))
}
