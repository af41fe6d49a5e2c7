//! Chat transport
//!
//! A transport turns one chat request into an ordered stream of body bytes.
//! The decoder never talks to the network itself, so tests and alternative
//! backends plug in here.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ChatError, Result};

/// Raw response body, chunk by chunk, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    /// Whether the model behind the service has finished loading.
    #[serde(default)]
    pub chatbot_ready: bool,
}

/// Opens response streams for chat requests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `request` and return its body as a byte stream.
    ///
    /// Fails with a transport-class `ChatError` when the service is
    /// unreachable or answers with a non-2xx status.
    async fn open(&self, request: &ChatRequest) -> Result<FragmentStream>;

    /// Query the service health endpoint.
    async fn health(&self) -> Result<HealthStatus>;
}

/// `reqwest`-backed transport for the chat service HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = config.http_client()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Use an existing client; `config` still supplies the URLs.
    pub fn with_http_client(config: ClientConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChatError::api_error(status.as_u16(), body))
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<FragmentStream> {
        let url = self.config.chat_url();
        debug!(url = %url, message_len = request.message.len(), "opening chat stream");
        let response = self.http_client.post(&url).json(request).send().await?;
        let response = check_status(response).await?;
        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ChatError::StreamError(format!("Body read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }

    async fn health(&self) -> Result<HealthStatus> {
        let url = self.config.health_url();
        let response = self.http_client.get(&url).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
