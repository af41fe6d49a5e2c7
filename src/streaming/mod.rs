//! Streaming Module
//!
//! Turns an ordered sequence of raw text fragments into clean content deltas:
//! - `StreamEvent`, the tagged event consumers receive
//! - `DiffEmitter`, the watermark over already-delivered text
//! - `StreamDecoder`, the per-response state machine
//! - async session driving a fragment stream, with cancellation
//! - `EventSink`, the callback-style consumer surface

mod decoder;
mod emitter;
mod events;
mod session;
mod sink;

pub use decoder::*;
pub use emitter::*;
pub use events::*;
pub use session::*;
pub use sink::*;
