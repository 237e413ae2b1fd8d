//! Merchant invoice endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::error::ApiResult;
use super::super::state::AppState;
use super::super::types::{CreateInvoiceRequest, InvoiceCreated, RecordIdRequest, Success};
use crate::api_auth::Credentials;
use crate::invoice::Invoice;

/// POST /api/v1/invoices/create
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InvoiceCreated>)> {
    let Json(req) = payload?;
    let (credentials, draft) = req.into_parts()?;
    let invoice = state.invoices.create(&credentials, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceCreated {
            id: invoice.id,
            status: invoice.status.as_str(),
        }),
    ))
}

/// POST /api/v1/invoices/info
pub async fn invoice_info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordIdRequest>, JsonRejection>,
) -> ApiResult<Json<Success<Invoice>>> {
    let Json(req) = payload?;
    let invoice = state.invoices.get(&req.credentials, &req.id).await?;
    Ok(Json(Success::new(invoice)))
}

/// POST /api/v1/invoices/history
pub async fn invoice_history(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Success<Vec<Invoice>>>> {
    let Json(credentials) = payload?;
    Ok(Json(Success::new(state.invoices.list(&credentials).await?)))
}

/// POST /api/v1/invoices/cancel
pub async fn cancel_invoice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordIdRequest>, JsonRejection>,
) -> ApiResult<Json<Success<Invoice>>> {
    let Json(req) = payload?;
    let invoice = state.invoices.cancel(&req.credentials, &req.id).await?;
    Ok(Json(Success::new(invoice)))
}

/// POST /api/v1/invoices/complete
pub async fn complete_invoice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordIdRequest>, JsonRejection>,
) -> ApiResult<Json<Success<Invoice>>> {
    let Json(req) = payload?;
    let invoice = state.invoices.complete(&req.credentials, &req.id).await?;
    Ok(Json(Success::new(invoice)))
}
