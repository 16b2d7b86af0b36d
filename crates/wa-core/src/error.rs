//! Error types for wa-core

use thiserror::Error;

/// Main error type for wa-core
#[derive(Error, Debug)]
pub enum ChatbotError {
    /// Missing or unusable provider configuration (server URL, API key)
    #[error("{0}")]
    Configuration(String),

    /// Network-level failure: timeout, connection refused, undecodable body, cancellation
    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    /// The provider answered with a non-success status
    #[error("{provider} API error (status {status}): {body}")]
    Provider {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("no response from {provider}")]
    EmptyResponse { provider: String },

    #[error("no text response from {provider}")]
    NoText { provider: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatbotError {
    pub(crate) fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Whether the caller may retry the call (with backoff).
    ///
    /// Transport failures and 5xx provider statuses are transient; 4xx statuses,
    /// configuration problems and well-formed but unusable replies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Well-formed provider reply that carried nothing deliverable.
    ///
    /// Callers answer these with a fallback message instead of an error.
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, Self::EmptyResponse { .. } | Self::NoText { .. })
    }
}

/// Result type alias for wa-core
pub type Result<T> = std::result::Result<T, ChatbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_message() {
        let err = ChatbotError::Provider {
            provider: "Rasa".to_string(),
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Rasa API error (status 500): Internal Server Error"
        );
    }

    #[test]
    fn test_retry_classification() {
        let server = ChatbotError::Provider {
            provider: "Rasa".to_string(),
            status: 503,
            body: String::new(),
        };
        let client = ChatbotError::Provider {
            provider: "Rasa".to_string(),
            status: 404,
            body: String::new(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(ChatbotError::transport("Rasa", "connection refused").is_retryable());
        assert!(!ChatbotError::Configuration("server URL is not configured".into()).is_retryable());
        assert!(!ChatbotError::NoText { provider: "Rasa".into() }.is_retryable());
    }

    #[test]
    fn test_soft_failures() {
        assert!(ChatbotError::EmptyResponse { provider: "Rasa".into() }.is_soft_failure());
        assert!(ChatbotError::NoText { provider: "Rasa".into() }.is_soft_failure());
        assert!(!ChatbotError::Validation("bad".into()).is_soft_failure());
    }
}
