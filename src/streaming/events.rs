//! Streaming event types

use serde::{Deserialize, Serialize};

use crate::sanitize::Metadata;

/// Event produced by a decoding session.
///
/// Ordering: zero or more `ContentDelta`, at most one `Metadata`, then exactly
/// one terminal event (`Completed`, `Failed` or `Cancelled`). Nothing follows a
/// terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Newly confirmed user-visible text.
    ContentDelta {
        /// The incremental text content
        delta: String,
    },
    /// Trailing metadata block.
    Metadata {
        /// Parsed metadata
        metadata: Metadata,
    },
    /// The response ended normally.
    Completed,
    /// The transport failed; carries the fixed user-facing message.
    Failed {
        /// User-facing message
        message: String,
    },
    /// The consumer cancelled the session.
    Cancelled,
}

impl StreamEvent {
    pub fn content(delta: impl Into<String>) -> Self {
        Self::ContentDelta {
            delta: delta.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. } | Self::Cancelled)
    }

    /// Terminal outcome carried by this event, if any.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self {
            Self::Completed => Some(SessionOutcome::Completed),
            Self::Failed { message } => Some(SessionOutcome::Failed {
                message: message.clone(),
            }),
            Self::Cancelled => Some(SessionOutcome::Cancelled),
            _ => None,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Completed,
    Failed { message: String },
    Cancelled,
}

/// Everything a session delivered, gathered in one value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectedResponse {
    /// Concatenation of all content deltas.
    pub text: String,
    pub metadata: Option<Metadata>,
    /// `None` if the stream ended without a terminal event.
    pub outcome: Option<SessionOutcome>,
}

impl CollectedResponse {
    /// Fold one event into the collected state.
    pub fn absorb(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::ContentDelta { delta } => self.text.push_str(&delta),
            StreamEvent::Metadata { metadata } => self.metadata = Some(metadata),
            other => self.outcome = other.outcome(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Some(SessionOutcome::Completed)
    }
}
