//! Mapping of pipeline errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::{Error, ErrorClass};

/// Error wrapper returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::Auth => StatusCode::UNAUTHORIZED,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::PartialFetch => StatusCode::BAD_GATEWAY,
        ErrorClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let class = self.0.class();
        let status = status_for(class);
        if status.is_server_error() {
            warn!(kind = ?class, error = %self.0, "Request failed");
        }

        let mut body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": class,
            "retryable": self.0.is_retryable(),
        });
        if let Error::BatchFailed { failures } = &self.0 {
            body["failures"] = serde_json::json!(failures);
        }

        (status, Json(body)).into_response()
    }
}
