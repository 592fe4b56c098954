//! Application error taxonomy.
//!
//! Every fallible operation in the service funnels into [`AppError`],
//! which carries enough shape to map onto an HTTP status and a stable
//! numeric error code at the gateway boundary.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::gateway::types::{ApiResponse, error_codes};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("insufficient remaining: requested {requested}, available {available}")]
    InsufficientRemaining { requested: i32, available: i32 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("a sync is already in progress")]
    SyncBusy,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream response malformed: {0}")]
    UpstreamMalformed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status the error maps to at the boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition(_)
            | AppError::InsufficientRemaining { .. }
            | AppError::Conflict(_)
            | AppError::SyncBusy => StatusCode::CONFLICT,
            AppError::UpstreamUnavailable(_) | AppError::UpstreamMalformed(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable numeric code carried in the response envelope.
    pub fn code(&self) -> i32 {
        match self {
            AppError::Unauthorized(_) => error_codes::AUTH_FAILED,
            AppError::Forbidden(_) => error_codes::FORBIDDEN,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Validation(_) => error_codes::INVALID_PARAMETER,
            AppError::InvalidTransition(_) => error_codes::INVALID_TRANSITION,
            AppError::InsufficientRemaining { .. } => error_codes::INSUFFICIENT_REMAINING,
            AppError::Conflict(_) => error_codes::CONFLICT,
            AppError::SyncBusy => error_codes::SYNC_BUSY,
            AppError::UpstreamUnavailable(_) => error_codes::UPSTREAM_UNAVAILABLE,
            AppError::UpstreamMalformed(_) => error_codes::UPSTREAM_MALFORMED,
            AppError::Database(_) | AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Message safe to return to the caller. Database and internal errors
    /// are logged server-side and collapsed to a generic message.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "internal error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:?}", e);
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()>::error(self.code(), self.public_message());
        (status, Json(body)).into_response()
    }
}

/// A unique-constraint violation on insert usually means a concurrent
/// writer got there first; surface it as a conflict instead of a 500.
pub fn map_unique_violation(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::Conflict(format!("{what} already exists"));
        }
    }
    AppError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            AppError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("order".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidTransition("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InsufficientRemaining {
                requested: 5,
                available: 2
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::SyncBusy.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::UpstreamUnavailable("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::UpstreamMalformed("bad json".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            AppError::Unauthorized("".into()).code(),
            AppError::Forbidden("".into()).code(),
            AppError::NotFound("".into()).code(),
            AppError::Validation("".into()).code(),
            AppError::InvalidTransition("".into()).code(),
            AppError::InsufficientRemaining {
                requested: 1,
                available: 0,
            }
            .code(),
            AppError::Conflict("".into()).code(),
            AppError::SyncBusy.code(),
            AppError::UpstreamUnavailable("".into()).code(),
            AppError::UpstreamMalformed("".into()).code(),
        ];
        let mut deduped = codes.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn insufficient_remaining_message_carries_quantities() {
        let err = AppError::InsufficientRemaining {
            requested: 7,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('7') && msg.contains('3'));
    }

    #[test]
    fn unique_violation_maps_to_conflict_only_for_23505() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, "username");
        assert!(matches!(err, AppError::Database(_)));
    }
}
