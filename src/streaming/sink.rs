//! Callback-style consumption
//!
//! For consumers that prefer callbacks over polling a stream. Every method has
//! a no-op default, so a sink only implements what it cares about.

use futures::{Stream, StreamExt};

use super::events::{SessionOutcome, StreamEvent};
use crate::sanitize::Metadata;

/// Receives the events of one session.
pub trait EventSink: Send {
    /// Newly confirmed clean text.
    fn on_chunk(&mut self, _delta: &str) {}

    /// The trailing metadata block.
    fn on_metadata(&mut self, _metadata: &Metadata) {}

    /// The response ended normally.
    fn on_complete(&mut self) {}

    /// The transport failed; `message` is the fixed user-facing text.
    fn on_error(&mut self, _message: &str) {}

    /// The session was cancelled by the consumer.
    fn on_cancelled(&mut self) {}
}

/// Feed every event of `stream` into `sink`.
///
/// Returns the terminal outcome, or `None` if the stream ended without one.
pub async fn dispatch<S, K>(stream: S, sink: &mut K) -> Option<SessionOutcome>
where
    S: Stream<Item = StreamEvent>,
    K: EventSink + ?Sized,
{
    futures::pin_mut!(stream);
    let mut outcome = None;
    while let Some(event) = stream.next().await {
        match &event {
            StreamEvent::ContentDelta { delta } => sink.on_chunk(delta),
            StreamEvent::Metadata { metadata } => sink.on_metadata(metadata),
            StreamEvent::Completed => sink.on_complete(),
            StreamEvent::Failed { message } => sink.on_error(message),
            StreamEvent::Cancelled => sink.on_cancelled(),
        }
        if let Some(terminal) = event.outcome() {
            outcome = Some(terminal);
            break;
        }
    }
    outcome
}
