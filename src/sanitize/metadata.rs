//! Trailing metadata block
//!
//! The producer appends `__METADATA__<json>__END__` after all content text.
//! Only the text before the opening delimiter is content; the JSON is never
//! scanned for sentinels.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opening delimiter of the metadata block.
pub const METADATA_OPEN: &str = "__METADATA__";
/// Closing delimiter of the metadata block.
pub const METADATA_CLOSE: &str = "__END__";

static METADATA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "(?s){}(.+?){}",
        regex::escape(METADATA_OPEN),
        regex::escape(METADATA_CLOSE)
    ))
    .expect("metadata delimiter pattern compiles")
});

/// Structured data attached to the end of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Retrieval confidence in `[0, 1]`.
    pub confidence: f64,
    /// Identifiers of the source documents the answer was built from.
    #[serde(
        default,
        alias = "relatedTickets",
        skip_serializing_if = "Option::is_none"
    )]
    pub related_tickets: Option<Vec<String>>,
    /// Block tag; the producer sends `"metadata"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Metadata {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence,
            related_tickets: None,
            kind: None,
        }
    }

    pub fn with_related_tickets(mut self, tickets: Vec<String>) -> Self {
        self.related_tickets = Some(tickets);
        self
    }

    /// Parse and validate the JSON body of a metadata block.
    pub fn parse(json: &str) -> Result<Self, MetadataError> {
        let metadata: Metadata = serde_json::from_str(json.trim())
            .map_err(|e| MetadataError::Malformed(e.to_string()))?;
        if !(0.0..=1.0).contains(&metadata.confidence) {
            return Err(MetadataError::ConfidenceOutOfRange(metadata.confidence));
        }
        Ok(metadata)
    }
}

/// Why a metadata block was dropped. Never fails a session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("malformed metadata JSON: {0}")]
    Malformed(String),
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// A complete metadata block found in accumulated text.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBlock<'a> {
    /// Raw text before the opening delimiter.
    pub payload: &'a str,
    /// Raw JSON between the delimiters.
    pub json: &'a str,
    /// Parsed block, or the reason it was dropped.
    pub metadata: Result<Metadata, MetadataError>,
}

/// Find the first complete `__METADATA__...__END__` block.
pub fn extract_metadata(text: &str) -> Option<MetadataBlock<'_>> {
    let captures = METADATA_PATTERN.captures(text)?;
    let json = captures.get(1)?.as_str();
    Some(MetadataBlock {
        payload: content_region(text),
        json,
        metadata: Metadata::parse(json),
    })
}

/// Text before the first opening delimiter, or all of `text`.
pub fn content_region(text: &str) -> &str {
    match text.find(METADATA_OPEN) {
        Some(idx) => &text[..idx],
        None => text,
    }
}
