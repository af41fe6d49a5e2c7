//! Utility modules for chat-sieve

pub mod cancel;
pub mod utf8_decoder;

pub use cancel::{CancelHandle, new_cancel_handle};
pub use utf8_decoder::Utf8StreamDecoder;
