//! Application error type mapping to HTTP status codes and `{"error": ...}` bodies.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use parley_types::error::ChatError;
use parley_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Failure of a chat turn or a store read.
    Chat(ChatError),
    /// Request body could not be decoded.
    BadBody(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadBody(e.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadBody(_) | AppError::Chat(ChatError::InvalidRequest(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Chat(ChatError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Chat(ChatError::ProviderFailure(LlmError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            AppError::Chat(ChatError::ProviderFailure(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Chat(e) => e.to_string(),
            AppError::BadBody(msg) => format!("invalid request: {msg}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
