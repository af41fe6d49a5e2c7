//! Per-response decoding state machine
//!
//! One `StreamDecoder` handles exactly one logical response. Each fragment is
//! appended to the raw accumulator, then per cycle:
//!
//! 1. a complete metadata block finishes the session (content, metadata,
//!    `Completed`);
//! 2. otherwise the confirmed clean prefix is diffed against what was already
//!    delivered and the new characters are emitted;
//! 3. an end marker or orphan bracket in the content finishes the session.
//!
//! Text that might still turn out to be a sentinel, the metadata delimiter or
//! trailing noise is held back until later fragments decide it, so nothing
//! delivered ever has to be retracted.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use super::emitter::DiffEmitter;
use super::events::StreamEvent;
use crate::defaults;
use crate::error::ChatError;
use crate::sanitize::{
    METADATA_OPEN, SentinelSet, content_region, default_sentinels, extract_metadata,
};

/// Decoder settings shared by every session of a client.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Sentinel vocabulary to strip and detect.
    pub sentinels: Arc<SentinelSet>,
    /// Message carried by `StreamEvent::Failed`.
    pub failure_message: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sentinels: default_sentinels(),
            failure_message: defaults::session::FAILURE_MESSAGE.to_string(),
        }
    }
}

impl DecoderConfig {
    pub fn with_sentinels(mut self, sentinels: Arc<SentinelSet>) -> Self {
        self.sentinels = sentinels;
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }
}

/// Lifecycle of a decoding session.
///
/// `Streaming` is the only state that accepts input; the others are terminal
/// and are entered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Streaming,
    Done,
    Failed,
    Cancelled,
}

/// Incremental decoder for one streamed response.
#[derive(Debug)]
pub struct StreamDecoder {
    config: DecoderConfig,
    raw: String,
    confirmed: usize,
    emitter: DiffEmitter,
    state: DecoderState,
    request_id: String,
    fragments: usize,
}

impl StreamDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            raw: String::new(),
            confirmed: 0,
            emitter: DiffEmitter::new(),
            state: DecoderState::Streaming,
            request_id: String::new(),
            fragments: 0,
        }
    }

    /// Tag log records of this session with `request_id`.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state != DecoderState::Streaming
    }

    /// Every fragment received so far, in arrival order.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Byte length of the raw prefix no future fragment can change.
    pub fn confirmed_len(&self) -> usize {
        self.confirmed
    }

    /// Raw tail held back as a possible partial sentinel or delimiter.
    pub fn held_suffix(&self) -> &str {
        &self.raw[self.confirmed..]
    }

    /// Clean text delivered so far.
    pub fn emitted(&self) -> &str {
        self.emitter.emitted()
    }

    /// Count of clean characters delivered so far.
    pub fn watermark(&self) -> usize {
        self.emitter.watermark()
    }

    /// Feed the next fragment and return the events it produced.
    pub fn push(&mut self, fragment: &str) -> Vec<StreamEvent> {
        if self.is_terminated() {
            debug!(
                request_id = %self.request_id,
                state = ?self.state,
                "fragment after terminal state ignored"
            );
            return Vec::new();
        }
        self.fragments += 1;
        self.raw.push_str(fragment);
        trace!(
            request_id = %self.request_id,
            fragment = self.fragments,
            fragment_len = fragment.len(),
            raw_len = self.raw.len(),
            "fragment received"
        );

        let mut events = Vec::new();
        let sentinels = self.config.sentinels.clone();

        let block = extract_metadata(&self.raw)
            .map(|block| (sentinels.canonicalize(block.payload), block.metadata));
        if let Some((content, metadata)) = block {
            self.confirmed = self.raw.len();
            self.emit(&content, &mut events);
            match metadata {
                Ok(metadata) => {
                    debug!(
                        request_id = %self.request_id,
                        confidence = metadata.confidence,
                        "metadata received"
                    );
                    events.push(StreamEvent::Metadata { metadata });
                }
                Err(e) => {
                    warn!(
                        request_id = %self.request_id,
                        error = %e,
                        "dropping malformed metadata block"
                    );
                }
            }
            self.complete(&mut events);
            return events;
        }

        let region = content_region(&self.raw);
        let block_opened = region.len() < self.raw.len();
        let finished = sentinels.has_complete_end_marker(region);
        let snapshot = if block_opened || finished {
            // no more content can follow
            self.confirmed = region.len();
            sentinels.canonicalize(region)
        } else {
            self.confirmed = sentinels.confirmed_len(region, &[METADATA_OPEN]);
            sentinels.stable_prefix(&region[..self.confirmed], &[])
        };
        self.emit(&snapshot, &mut events);

        if finished {
            debug!(request_id = %self.request_id, "end marker detected");
            self.complete(&mut events);
        }
        events
    }

    /// Natural end of input: flush held-back text and complete.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.is_terminated() {
            return Vec::new();
        }
        let region = content_region(&self.raw);
        if region.len() < self.raw.len() {
            warn!(request_id = %self.request_id, "metadata block never closed; dropping it");
        }
        let content = self.config.sentinels.canonicalize(region);
        self.confirmed = region.len();
        let mut events = Vec::new();
        self.emit(&content, &mut events);
        self.complete(&mut events);
        events
    }

    /// Transport failure: deliver the fixed user-facing message.
    pub fn fail(&mut self, err: &ChatError) -> Vec<StreamEvent> {
        if self.is_terminated() {
            return Vec::new();
        }
        error!(request_id = %self.request_id, error = %err, "chat stream failed");
        self.state = DecoderState::Failed;
        vec![StreamEvent::Failed {
            message: self.config.failure_message.clone(),
        }]
    }

    /// Consumer-requested stop.
    pub fn cancel(&mut self) -> Vec<StreamEvent> {
        if self.is_terminated() {
            return Vec::new();
        }
        debug!(
            request_id = %self.request_id,
            emitted = self.emitter.watermark(),
            "chat stream cancelled"
        );
        self.state = DecoderState::Cancelled;
        vec![StreamEvent::Cancelled]
    }

    fn emit(&mut self, snapshot: &str, events: &mut Vec<StreamEvent>) {
        if let Some(delta) = self.emitter.compute_delta(snapshot) {
            events.push(StreamEvent::ContentDelta { delta });
        }
    }

    fn complete(&mut self, events: &mut Vec<StreamEvent>) {
        debug!(
            request_id = %self.request_id,
            fragments = self.fragments,
            emitted = self.emitter.watermark(),
            "chat stream completed"
        );
        self.state = DecoderState::Done;
        events.push(StreamEvent::Completed);
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}
