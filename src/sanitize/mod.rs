//! Text sanitizing for streamed model output
//!
//! Pure functions over accumulated raw text:
//! - sentinel vocabulary (`SentinelSet`)
//! - canonicalization and completion detection
//! - trailing metadata block extraction

mod canonicalize;
mod metadata;
mod sentinels;

pub use canonicalize::*;
pub use metadata::*;
pub use sentinels::*;
