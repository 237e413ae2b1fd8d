//! Company handlers (JWT)

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;
use validator::Validate;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use super::super::types::Success;
use super::claims_user_id;
use crate::account::{Company, Membership, NewCompany};
use crate::db::StoreError;
use crate::user_auth::Claims;

/// GET /api/v1/companies
///
/// Every company the caller is related to, verified or not.
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Success<Vec<Company>>>> {
    let user_id = claims_user_id(&claims)?;
    let companies = state
        .accounts
        .companies_for_user(user_id, Membership::Any)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(Success::new(companies)))
}

/// POST /api/v1/companies
///
/// The creator becomes a verified member.
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewCompany>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Success<Company>>)> {
    let user_id = claims_user_id(&claims)?;
    let Json(new_company) = payload?;
    new_company
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let company = state
        .accounts
        .create_company(user_id, new_company)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => ApiError::bad_request("Company already exists"),
            other => ApiError::internal(other),
        })?;
    info!(user_id, company_id = company.company_id, "Company created");
    Ok((StatusCode::CREATED, Json(Success::new(company))))
}
