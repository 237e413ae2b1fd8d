//! HTTP error rendering
//!
//! Every failure leaves the gateway as `{"status":"failed","message":...}`.
//! Storage failures are logged here and rendered with a generic message.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::api_auth::KeyError;
use crate::invoice::InvoiceError;
use crate::reporting::ReportingError;
use crate::subscription::SubscriptionError;
use crate::user_auth::UserAuthError;
use crate::withdrawal::WithdrawalError;

const INTERNAL_MESSAGE: &str = "Internal server error";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FailedBody {
    pub status: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Log the detail, answer with a generic 500.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Request failed with internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = FailedBody {
            status: "failed",
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<WithdrawalError> for ApiError {
    fn from(err: WithdrawalError) -> Self {
        match err {
            WithdrawalError::NotFound => ApiError::not_found(err.to_string()),
            WithdrawalError::Unauthorized
            | WithdrawalError::QuotaExceeded
            | WithdrawalError::InvalidTransition { .. }
            | WithdrawalError::InsufficientBalance { .. }
            | WithdrawalError::Validation(_)
            | WithdrawalError::CallbackDeliveryFailed(_) => ApiError::bad_request(err.to_string()),
            WithdrawalError::Storage(_) | WithdrawalError::Internal(_) => ApiError::internal(err),
        }
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::NotFound => ApiError::not_found(err.to_string()),
            InvoiceError::Unauthorized | InvoiceError::Validation(_) => {
                ApiError::bad_request(err.to_string())
            }
            InvoiceError::Storage(_) => ApiError::internal(err),
        }
    }
}

impl From<ReportingError> for ApiError {
    fn from(err: ReportingError) -> Self {
        match err {
            ReportingError::Unauthorized => ApiError::bad_request(err.to_string()),
            ReportingError::UnknownUser => ApiError::not_found(err.to_string()),
            ReportingError::Storage(_) => ApiError::internal(err),
        }
    }
}

impl From<KeyError> for ApiError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::CompanyNotFound | KeyError::KeyNotFound => {
                ApiError::not_found(err.to_string())
            }
            KeyError::Storage(_) => ApiError::internal(err),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::PlanNotFound | SubscriptionError::CompanyNotFound => {
                ApiError::not_found(err.to_string())
            }
            SubscriptionError::PlanInUse => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            SubscriptionError::Validation(_) => ApiError::bad_request(err.to_string()),
            SubscriptionError::Storage(_) => ApiError::internal(err),
        }
    }
}

impl From<UserAuthError> for ApiError {
    fn from(err: UserAuthError) -> Self {
        match err {
            UserAuthError::UserNotFound => ApiError::not_found(err.to_string()),
            UserAuthError::InvalidLogin | UserAuthError::InvalidToken => {
                ApiError::unauthorized(err.to_string())
            }
            UserAuthError::EmailTaken
            | UserAuthError::AlreadyVerified
            | UserAuthError::WrongPassword
            | UserAuthError::Validation(_) => ApiError::bad_request(err.to_string()),
            UserAuthError::Mail(_) | UserAuthError::Hashing(_) | UserAuthError::Storage(_) => {
                ApiError::internal(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::withdrawal::WithdrawalStatus;

    #[test]
    fn test_withdrawal_error_status_mapping() {
        assert_eq!(
            ApiError::from(WithdrawalError::Unauthorized).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WithdrawalError::NotFound).status,
            StatusCode::NOT_FOUND
        );
        let err = ApiError::from(WithdrawalError::InvalidTransition {
            action: "cancelled",
            status: WithdrawalStatus::Processing,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Withdrawal request cannot be cancelled");
    }

    #[test]
    fn test_storage_errors_hide_detail() {
        let err = ApiError::from(WithdrawalError::Storage(StoreError::Corrupt(
            "status column holds 'bogus'".to_string(),
        )));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_plan_in_use_is_conflict() {
        assert_eq!(
            ApiError::from(SubscriptionError::PlanInUse).status,
            StatusCode::CONFLICT
        );
    }
}
