//! Default Configuration Values
//!
//! Centralizes the defaults used by the client, the transport and the decoder.

use std::time::Duration;

/// HTTP client defaults
pub mod http {
    use super::*;

    /// Base URL of the chat service when nothing else is configured.
    pub const BASE_URL: &str = "http://localhost:8000";

    /// Environment variable overriding [`BASE_URL`].
    pub const BASE_URL_ENV: &str = "CHAT_SIEVE_BASE_URL";

    /// Chat submission endpoint.
    pub const CHAT_PATH: &str = "/api/chat";

    /// Health probe endpoint.
    pub const HEALTH_PATH: &str = "/api/health";

    /// Request timeout. Bounds the whole streamed answer, not just the headers.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default User-Agent string.
    pub const USER_AGENT: &str = concat!("chat-sieve/", env!("CARGO_PKG_VERSION"));
}

/// Session defaults
pub mod session {
    /// Message delivered through `StreamEvent::Failed` for every transport failure.
    pub const FAILURE_MESSAGE: &str = "Error while communicating with the server.";
}
