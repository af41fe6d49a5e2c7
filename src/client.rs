//! Chat client
//!
//! Entry point for sending a message and consuming the cleaned answer.
//!
//! ```rust,no_run
//! use chat_sieve::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), ChatError> {
//! let client = ChatClient::new(ClientConfig::default())?;
//! let mut handle = client.send_message("Comment réinitialiser mon mot de passe ?")?;
//! while let Some(event) = handle.next().await {
//!     if let StreamEvent::ContentDelta { delta } = event {
//!         print!("{delta}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ChatError, Result};
use crate::sanitize::{SentinelSet, default_sentinels};
use crate::streaming::{ChatStreamHandle, DecoderConfig, open_session};
use crate::transport::{ChatRequest, ChatTransport, HttpTransport};

/// Client for the chat service.
///
/// Cheap to clone; clones share the transport and the sentinel table.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    sentinels: Arc<SentinelSet>,
    failure_message: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("sentinels", &self.sentinels.len())
            .field("failure_message", &self.failure_message)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// HTTP client for the service described by `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let failure_message = config.failure_message.clone();
        let transport = HttpTransport::new(config)?;
        Ok(Self {
            transport: Arc::new(transport),
            sentinels: default_sentinels(),
            failure_message,
        })
    }

    /// Client over a custom transport, with default decoder settings.
    pub fn with_transport(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            sentinels: default_sentinels(),
            failure_message: crate::defaults::session::FAILURE_MESSAGE.to_string(),
        }
    }

    /// Replace the sentinel vocabulary.
    pub fn with_sentinels(mut self, sentinels: Arc<SentinelSet>) -> Self {
        self.sentinels = sentinels;
        self
    }

    /// Replace the message delivered on transport failure.
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            sentinels: self.sentinels.clone(),
            failure_message: self.failure_message.clone(),
        }
    }

    /// Submit `message` and return the session handle.
    ///
    /// A blank message is rejected before any I/O. Every later problem,
    /// including an unreachable service, arrives as a `Failed` event.
    pub fn send_message(&self, message: impl Into<String>) -> Result<ChatStreamHandle> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ChatError::ConfigurationError(
                "Message must not be empty".to_string(),
            ));
        }
        let handle = open_session(
            self.transport.clone(),
            ChatRequest::new(message),
            self.decoder_config(),
        );
        debug!(request_id = %handle.request_id, "chat session created");
        Ok(handle)
    }

    /// Whether the service is up and its model is loaded.
    ///
    /// Any failure (network, status, body) reads as `false`.
    pub async fn check_health(&self) -> bool {
        match self.transport.health().await {
            Ok(status) => {
                debug!(status = ?status.status, ready = status.chatbot_ready, "health probe");
                status.chatbot_ready
            }
            Err(e) => {
                warn!(error = %e, "health probe failed");
                false
            }
        }
    }
}
