use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::{Value, json};

use crate::checkin::{CheckinError, ScanRejection};

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `CONFLICT`, `INVALID_TOKEN`, `SESSION_CLOSED`, `SESSION_EXPIRED`,
    /// `NOT_ELIGIBLE`, `ALREADY_CHECKED_IN`, `STORE_UNAVAILABLE`,
    /// `PARTIAL_CASCADE_FAILURE`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "period must be >= 1")]
    pub message: String,
    /// Extra context, e.g. the original check-in time for `ALREADY_CHECKED_IN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    /// A scan the validator turned down.
    CheckIn(ScanRejection),
    StoreUnavailable(String),
    PartialCascade {
        collection: &'static str,
        deleted: u64,
        detail: String,
    },
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
            AppError::CheckIn(rejection) => rejection_response(rejection),
            AppError::StoreUnavailable(detail) => {
                tracing::error!("Record store unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody::new(
                        "STORE_UNAVAILABLE",
                        "The record store is unavailable, try again shortly",
                    ),
                )
            }
            AppError::PartialCascade {
                collection,
                deleted,
                detail,
            } => {
                tracing::error!(collection, deleted, "Partial cascade failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "PARTIAL_CASCADE_FAILURE",
                        message: format!(
                            "Delete stopped in '{collection}' after {deleted} records; repeat the request to finish"
                        ),
                        details: Some(json!({ "collection": collection, "deleted": deleted })),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

fn rejection_response(rejection: ScanRejection) -> (StatusCode, ErrorBody) {
    let status = match &rejection {
        ScanRejection::InvalidToken => StatusCode::NOT_FOUND,
        ScanRejection::SessionClosed { .. } | ScanRejection::SessionExpired { .. } => {
            StatusCode::GONE
        }
        ScanRejection::NotEligible { .. } => StatusCode::FORBIDDEN,
        ScanRejection::AlreadyCheckedIn { .. } => StatusCode::CONFLICT,
    };
    let details = match &rejection {
        ScanRejection::InvalidToken => None,
        ScanRejection::SessionClosed { session_id } => Some(json!({ "session_id": session_id })),
        ScanRejection::SessionExpired {
            session_id,
            expired_at,
        } => Some(json!({ "session_id": session_id, "expired_at": expired_at })),
        ScanRejection::NotEligible {
            session_id,
            classroom_id,
        } => Some(json!({ "session_id": session_id, "classroom_id": classroom_id })),
        ScanRejection::AlreadyCheckedIn {
            record_id,
            classroom_id,
            checked_in_at,
        } => Some(json!({
            "record_id": record_id,
            "classroom_id": classroom_id,
            "checked_in_at": checked_in_at,
        })),
    };
    (
        status,
        ErrorBody {
            code: rejection.code(),
            message: rejection.message(),
            details,
        },
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<ScanRejection> for AppError {
    fn from(rejection: ScanRejection) -> Self {
        AppError::CheckIn(rejection)
    }
}

impl From<CheckinError> for AppError {
    fn from(err: CheckinError) -> Self {
        match err {
            CheckinError::StoreUnavailable(e) => AppError::StoreUnavailable(e.to_string()),
            CheckinError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            CheckinError::Invalid(msg) => AppError::Validation(msg),
            CheckinError::Conflict(msg) => {
                tracing::warn!("Write conflict: {msg}");
                AppError::Conflict(msg)
            }
            CheckinError::PartialCascadeFailure {
                collection,
                deleted,
                source,
            } => AppError::PartialCascade {
                collection,
                deleted,
                detail: source.to_string(),
            },
        }
    }
}
