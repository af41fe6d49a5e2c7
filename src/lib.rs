//! chat-sieve
//!
//! Incremental decoder for streamed chat-completion text. A chat service
//! streams its answer as plain text that may contain leaked model control
//! tokens and ends with a `__METADATA__{...}__END__` block. chat-sieve turns
//! that body into clean, monotonically growing content deltas, a parsed
//! metadata value and exactly one terminal event.
//!
//! - [`sanitize`]: pure functions over accumulated text
//! - [`streaming`]: the per-response decoder and the async session
//! - [`client`] / [`transport`]: HTTP access to `/api/chat` and `/api/health`
//! - [`telemetry`]: tracing subscriber setup
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod defaults;
pub mod error;
pub mod sanitize;
pub mod streaming;
pub mod telemetry;
pub mod transport;
pub mod utils;

pub use client::ChatClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ChatError, Result};
pub use sanitize::{
    Metadata, SentinelSet, canonicalize, extract_metadata, has_complete_end_marker,
};
pub use streaming::{
    ChatStreamHandle, CollectedResponse, EventSink, SessionOutcome, StreamDecoder, StreamEvent,
};
pub use transport::{ChatRequest, ChatTransport, HttpTransport};

/// Common imports
pub mod prelude {
    pub use crate::client::ChatClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{ChatError, Result};
    pub use crate::sanitize::{Metadata, Sentinel, SentinelSet};
    pub use crate::streaming::{
        ChatStreamHandle, CollectedResponse, EventSink, SessionOutcome, StreamEvent, dispatch,
    };
    pub use crate::utils::cancel::CancelHandle;
}
