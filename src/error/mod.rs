//! Error Handling Module
//!
//! - Core error type (`ChatError`) shared by the client, transport and telemetry
//! - Conversions from `reqwest` and `serde_json` errors
//!
//! Session-level failures never surface a `ChatError` to the consumer directly:
//! the decoder reports them as a `StreamEvent::Failed` carrying the fixed
//! user-facing message, while the detailed error is logged.

mod conversions;
pub mod types;

pub use types::*;
