use axum::{
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pigg_core::PiggError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// The message is generic; the store's own error is logged, not returned.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: PiggError,
    },
}

impl ApiError {
    /// Classify a service error for a route. Validation failures keep their
    /// message; everything else becomes `message` with status 500.
    pub fn from_core(message: &'static str) -> impl FnOnce(PiggError) -> ApiError {
        move |err| {
            if err.is_validation() {
                ApiError::BadRequest(err.to_string())
            } else {
                log::error!("{message}: {err}");
                ApiError::Internal { message, source: err }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::BadRequest(format!("Unreadable request body: {}", rejection.body_text()))
    }
}

/// Bodies are parsed as JSON whatever their `Content-Type`.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Malformed request body: {err}"))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Malformed query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
