//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Server timestamp in milliseconds
    pub timestamp_ms: i64,
}

/// Pings PostgreSQL when configured. Never exposes failure details.
///
/// - Healthy: 200 `{status: "ok", timestamp_ms}`
/// - Unhealthy: 503 `{status: "unavailable", timestamp_ms}`
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let timestamp_ms = Utc::now().timestamp_millis();

    if let Some(db) = state.database.as_ref()
        && let Err(e) = db.health_check().await
    {
        error!(error = %e, "PostgreSQL ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                timestamp_ms,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            timestamp_ms,
        }),
    )
}
