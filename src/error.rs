//! Error taxonomy for the review workflow.
//!
//! Every failure is reported to the caller with its specific kind; the
//! core never swallows an error to produce a default value. Validation
//! and state errors are deterministic; `Conflict` and
//! `DependencyUnavailable` are safe to retry as-is.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::SubmissionState;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// No usable credential on the request.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Authenticated but not authorized for this operation or target.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Unknown submission or attachment.
    #[error("not found")]
    NotFound,

    /// Operation not legal for the submission's current state.
    #[error("operation not permitted while the submission is {0}")]
    InvalidState(SubmissionState),

    /// A concurrent transition won the exclusion race; refetch and retry.
    #[error("the submission was modified concurrently")]
    Conflict,

    /// The identity provider or storage failed or timed out.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Invariant breach inside the service (e.g. an unreadable record).
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound,
            other => Error::DependencyUnavailable(other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Error::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Error::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            Error::DependencyUnavailable(msg) => {
                tracing::error!(error = %msg, "dependency unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "DEPENDENCY_UNAVAILABLE")
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            Error::DependencyUnavailable(_) => "a backing service is unavailable".to_string(),
            Error::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
