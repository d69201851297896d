//! Mapping of service errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::{
    error::{HelpdeskError, ValidationErrors},
    filter::FilterError,
};

const OPAQUE: &str = "internal server error";

/// JSON error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Offending fields, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

/// Handler error carrying a [`HelpdeskError`].
#[derive(Debug)]
pub struct ApiError(pub HelpdeskError);

impl From<HelpdeskError> for ApiError {
    fn from(err: HelpdeskError) -> Self { Self(err) }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self { Self(err.into()) }
}

impl ApiError {
    /// Status code the error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            HelpdeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            HelpdeskError::Validation(_) | HelpdeskError::Filter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HelpdeskError::Forbidden(_) => StatusCode::FORBIDDEN,
            HelpdeskError::ConcurrencyConflict(_)
            | HelpdeskError::Configuration(_)
            | HelpdeskError::Render(_)
            | HelpdeskError::Database(_)
            | HelpdeskError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.0 {
            HelpdeskError::Validation(fields) => ErrorBody {
                error: "validation failed".to_owned(),
                fields: Some(fields),
            },
            err if status.is_server_error() => {
                error!(error = %err, "request failed");
                ErrorBody {
                    error: OPAQUE.to_owned(),
                    fields: None,
                }
            }
            err => ErrorBody {
                error: err.to_string(),
                fields: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
