//! エラー型定義 (wa-api)

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use wa_core::ChatbotError;

/// wa-api のエラー型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthFailed,

    #[error("Missing or invalid X-Organization-Id header")]
    MissingOrganization,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Chatbot(#[from] ChatbotError),
}

/// Generic API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AuthFailed => StatusCode::UNAUTHORIZED,
            ApiError::MissingOrganization | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Chatbot(err) => match err {
                ChatbotError::Validation(_) => StatusCode::BAD_REQUEST,
                ChatbotError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ChatbotError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                ChatbotError::Transport { .. }
                | ChatbotError::Provider { .. }
                | ChatbotError::EmptyResponse { .. }
                | ChatbotError::NoText { .. } => StatusCode::BAD_GATEWAY,
                ChatbotError::Database(_)
                | ChatbotError::Store(_)
                | ChatbotError::Json(_)
                | ChatbotError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage details stay in the logs
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            if status.is_server_error() {
                warn!("Provider failure: {}", self);
            }
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::AuthFailed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ChatbotError::Validation("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatbotError::Configuration("server URL is not configured".into()))
                .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ChatbotError::Provider {
                provider: "Rasa".into(),
                status: 500,
                body: "Internal Server Error".into(),
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ChatbotError::Store("locked".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_provider_message_passes_through() {
        let err = ApiError::from(ChatbotError::NoText {
            provider: "Rasa".into(),
        });
        assert_eq!(err.to_string(), "no text response from Rasa");
    }
}
