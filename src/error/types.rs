//! Error types for chat-sieve.

use thiserror::Error;

/// Errors raised by the client, the transport and the ambient setup code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Generic HTTP failure (request could not be sent, body read failed).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The service answered with a non-2xx status.
    #[error("API error {code}: {message}")]
    ApiError {
        /// HTTP status code
        code: u16,
        /// Response body (may be empty)
        message: String,
    },

    /// Connection could not be established.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Request or body read timed out.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The response carried no readable stream, or the stream broke mid-way.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Invalid client or request configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The tracing subscriber could not be installed.
    #[error("Telemetry initialization error: {0}")]
    TelemetryInit(String),
}

impl ChatError {
    /// Create an API error from a status code and body text.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    /// Whether this error belongs to the transport failure class
    /// (non-2xx status, network failure, missing stream capability).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_)
                | Self::ApiError { .. }
                | Self::ConnectionError(_)
                | Self::TimeoutError(_)
                | Self::StreamError(_)
        )
    }

    /// HTTP status code, if the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
