//! Error types for procassist
//!
//! This module defines the error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! Two layers exist:
//!
//! - [`ApiError`] is the closed failure taxonomy of the backend client. Every
//!   transport or payload problem is classified into exactly one of its
//!   variants before leaving the `api` module.
//! - [`ProcassistError`] covers application-level failures (configuration,
//!   input coercion, terminal IO) and wraps `ApiError` for command handlers.

use thiserror::Error;

/// Fallback message used when a server error carries no readable message
pub const GENERIC_SERVER_ERROR: &str = "Server error occurred";

/// Failure taxonomy for backend operations
///
/// Assigned exhaustively at the API client boundary; no raw `reqwest`
/// error is ever returned to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered with a non-2xx status
    #[error("{status}: {message}")]
    Server {
        /// HTTP status code returned by the backend
        status: u16,
        /// Message extracted from the response body, or a generic fallback
        message: String,
    },

    /// The request was sent but no response arrived (connectivity, timeout)
    #[error("Network error - please check your connection")]
    Network(String),

    /// A 2xx response arrived without the expected payload fields
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),
}

impl ApiError {
    /// Builds a server error, substituting the generic fallback for a
    /// missing or blank message
    ///
    /// # Examples
    ///
    /// ```
    /// use procassist::error::ApiError;
    ///
    /// let err = ApiError::server(500, Some("DB unavailable".to_string()));
    /// assert_eq!(err.to_string(), "500: DB unavailable");
    ///
    /// let err = ApiError::server(502, None);
    /// assert_eq!(err.to_string(), "502: Server error occurred");
    /// ```
    pub fn server(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string());
        Self::Server { status, message }
    }

    /// Returns the HTTP status for server errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-readable name of the error kind, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Server { .. } => "server",
            Self::Network(_) => "network",
            Self::UnexpectedFormat(_) => "unexpected_format",
        }
    }
}

/// Result type for backend operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Main error type for procassist operations
#[derive(Error, Debug)]
pub enum ProcassistError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input that could not be coerced to the expected type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend call failures
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Interactive line editor errors
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Result type alias for procassist operations
///
/// Uses `anyhow::Error` so command handlers can attach context freely.
pub type Result<T> = anyhow::Result<T>;
