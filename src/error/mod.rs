//! Error types for the TSheets client.

pub mod api;

pub use api::ApiError;

use thiserror::Error;

/// Primary error type for all client operations.
#[derive(Error, Debug)]
pub enum TsheetsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Refresh token rejected: {0}")]
    RefreshTokenRejected(ApiError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authorization denied: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("Authorization abandoned before a code was issued")]
    AuthorizationAbandoned,

    #[error("Authorization state mismatch")]
    StateMismatch,

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Server,
    Api,
    Configuration,
    Serialization,
    Storage,
}

impl TsheetsError {
    /// The underlying transport failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) | Self::RefreshTokenRejected(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of the underlying transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        self.api_error().and_then(ApiError::status)
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(err) => match err.status() {
                None => ErrorCategory::Network,
                Some(401 | 403) => ErrorCategory::Authentication,
                Some(429) => ErrorCategory::RateLimit,
                Some(500..=599) => ErrorCategory::Server,
                Some(_) => ErrorCategory::Api,
            },
            Self::RefreshTokenRejected(_)
            | Self::NotAuthenticated
            | Self::AuthorizationDenied { .. }
            | Self::AuthorizationAbandoned
            | Self::StateMismatch => ErrorCategory::Authentication,
            Self::UnknownEndpoint(_) | Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TsheetsError>;
