//! Mapping errors to HTTP responses.

use crate::error::{Error, ErrorKind, panic_message};
use crate::output::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use tracing::{debug, error};

/// HTTP status for an error kind.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);

        let traceback = if kind == ErrorKind::Internal {
            let trace = self.trace();
            error!("Request failed: {trace}");
            Some(trace)
        } else {
            debug!("Request rejected ({status}): {self}");
            None
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            traceback,
        };
        (status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    Error::Internal {
        message: format!("request handler panicked: {}", panic_message(payload.as_ref())),
    }
    .into_response()
}
