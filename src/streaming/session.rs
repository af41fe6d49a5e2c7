//! Session controller
//!
//! Drives a transport's byte stream through a [`StreamDecoder`] and exposes
//! the result as a stream of [`StreamEvent`]s with first-class cancellation.
//! Cancellation covers both the request handshake and the body: the pending
//! read is abandoned, the body is dropped (closing the connection) and a
//! single `Cancelled` event is delivered.

use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::Instrument;

use super::decoder::{DecoderConfig, StreamDecoder};
use super::events::{CollectedResponse, StreamEvent};
use crate::error::Result;
use crate::transport::{ChatRequest, ChatTransport, FragmentStream};
use crate::utils::cancel::{CancelHandle, new_cancel_handle};
use crate::utils::utf8_decoder::Utf8StreamDecoder;

/// Event stream of one session. Ends right after the terminal event.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Chat event stream with first-class cancellation handle
pub struct ChatStreamHandle {
    /// The underlying event stream
    pub stream: ChatEventStream,
    /// Handle to cancel the session
    pub cancel: CancelHandle,
    /// Identifier attached to every log record of this session
    pub request_id: String,
}

static_assertions::assert_impl_all!(ChatStreamHandle: Send);
static_assertions::assert_impl_all!(ChatEventStream: Send);

impl std::fmt::Debug for ChatStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamHandle")
            .field("request_id", &self.request_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ChatStreamHandle {
    /// Request cancellation. No-op once the session has ended.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain the session into one value.
    pub async fn collect(mut self) -> CollectedResponse {
        let mut collected = CollectedResponse::default();
        while let Some(event) = self.stream.next().await {
            collected.absorb(event);
        }
        collected
    }
}

impl Stream for ChatStreamHandle {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

/// Open `request` on `transport` and decode the response.
///
/// Nothing happens until the returned stream is first polled.
pub fn open_session(
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    config: DecoderConfig,
) -> ChatStreamHandle {
    let request_id = uuid::Uuid::new_v4().to_string();
    let cancel = new_cancel_handle();
    let open = async move { transport.open(&request).await };
    ChatStreamHandle {
        stream: run_session(open, config, cancel.clone(), request_id.clone()),
        cancel,
        request_id,
    }
}

/// Decode an already opened fragment stream.
pub fn decode_fragments(
    fragments: FragmentStream,
    config: DecoderConfig,
    cancel: CancelHandle,
    request_id: impl Into<String>,
) -> ChatEventStream {
    run_session(async move { Ok(fragments) }, config, cancel, request_id.into())
}

fn run_session<F>(
    open: F,
    config: DecoderConfig,
    cancel: CancelHandle,
    request_id: String,
) -> ChatEventStream
where
    F: Future<Output = Result<FragmentStream>> + Send + 'static,
{
    let span = tracing::debug_span!("chat_session", request_id = %request_id);
    let open = open.instrument(span.clone());

    let s = async_stream::stream! {
        let mut decoder = StreamDecoder::new(config).with_request_id(request_id);
        let mut utf8 = Utf8StreamDecoder::new();

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = open => Some(res),
        };
        let mut fragments = match opened {
            None => {
                for event in span.in_scope(|| decoder.cancel()) {
                    yield event;
                }
                return;
            }
            Some(Err(e)) => {
                for event in span.in_scope(|| decoder.fail(&e)) {
                    yield event;
                }
                return;
            }
            Some(Ok(fragments)) => fragments,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = fragments.next() => Some(item),
            };
            let events = span.in_scope(|| match next {
                None => decoder.cancel(),
                Some(Some(Ok(bytes))) => {
                    let text = utf8.decode(&bytes);
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        decoder.push(&text)
                    }
                }
                Some(Some(Err(e))) => decoder.fail(&e),
                Some(None) => {
                    let tail = utf8.finish();
                    let mut events = if tail.is_empty() {
                        Vec::new()
                    } else {
                        decoder.push(&tail)
                    };
                    events.extend(decoder.finish());
                    events
                }
            });
            for event in events {
                yield event;
            }
            if decoder.is_terminated() {
                break;
            }
        }
    };
    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::streaming::SessionOutcome;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::time::Duration;

    fn fragments(parts: Vec<Result<Bytes>>) -> FragmentStream {
        Box::pin(futures::stream::iter(parts))
    }

    fn text(parts: &[&'static str]) -> FragmentStream {
        fragments(parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect())
    }

    async fn drain(stream: ChatEventStream) -> Vec<StreamEvent> {
        stream.collect().await
    }

    #[tokio::test]
    async fn decodes_plain_body() {
        let events = drain(decode_fragments(
            text(&["Bon", "jour ", "le m", "onde"]),
            DecoderConfig::default(),
            new_cancel_handle(),
            "t",
        ))
        .await;
        let mut collected = CollectedResponse::default();
        for event in events {
            collected.absorb(event);
        }
        assert_eq!(collected.text, "Bonjour le monde");
        assert!(collected.is_completed());
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        let bytes = "Ça va très bien".as_bytes();
        let parts = bytes
            .chunks(1)
            .map(|b| Ok(Bytes::copy_from_slice(b)))
            .collect();
        let events = drain(decode_fragments(
            fragments(parts),
            DecoderConfig::default(),
            new_cancel_handle(),
            "t",
        ))
        .await;
        let joined: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ContentDelta { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(joined, "Ça va très bien");
    }

    #[tokio::test]
    async fn stops_reading_after_end_marker() {
        let events = drain(decode_fragments(
            fragments(vec![
                Ok(Bytes::from_static(b"hi</s>")),
                Err(ChatError::StreamError("never read".into())),
            ]),
            DecoderConfig::default(),
            new_cancel_handle(),
            "t",
        ))
        .await;
        assert_eq!(events, vec![StreamEvent::content("hi"), StreamEvent::Completed]);
    }

    #[tokio::test]
    async fn body_error_fails_with_fixed_message() {
        let config = DecoderConfig::default().with_failure_message("Erreur");
        let events = drain(decode_fragments(
            fragments(vec![
                Ok(Bytes::from_static(b"partial answer ")),
                Err(ChatError::StreamError("reset by peer".into())),
            ]),
            config,
            new_cancel_handle(),
            "t",
        ))
        .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::content("partial answer"),
                StreamEvent::Failed {
                    message: "Erreur".into()
                }
            ]
        );
    }

    #[tokio::test]
    async fn cancel_before_first_poll() {
        let cancel = new_cancel_handle();
        cancel.cancel();
        let events = drain(decode_fragments(
            text(&["never"]),
            DecoderConfig::default(),
            cancel,
            "t",
        ))
        .await;
        assert_eq!(events, vec![StreamEvent::Cancelled]);
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_data() {
        let cancel = new_cancel_handle();
        let body: FragmentStream = Box::pin(
            futures::stream::iter(vec![Ok(Bytes::from_static(b"Hello "))])
                .chain(futures::stream::pending()),
        );
        let mut stream = decode_fragments(body, DecoderConfig::default(), cancel.clone(), "t");

        assert_eq!(stream.next().await, Some(StreamEvent::content("Hello")));
        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert_eq!(next, Some(StreamEvent::Cancelled));
        assert_eq!(stream.next().await, None);
    }

    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn open(&self, _request: &ChatRequest) -> Result<FragmentStream> {
            Err(ChatError::api_error(500, "boom"))
        }

        async fn health(&self) -> Result<crate::transport::HealthStatus> {
            Err(ChatError::ConnectionError("down".into()))
        }
    }

    struct StalledTransport;

    #[async_trait]
    impl ChatTransport for StalledTransport {
        async fn open(&self, _request: &ChatRequest) -> Result<FragmentStream> {
            futures::future::pending().await
        }

        async fn health(&self) -> Result<crate::transport::HealthStatus> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn handshake_failure_is_a_failed_session() {
        let handle = open_session(
            Arc::new(FailingTransport),
            ChatRequest::new("hi"),
            DecoderConfig::default(),
        );
        assert!(!handle.request_id.is_empty());
        let collected = handle.collect().await;
        assert_eq!(collected.text, "");
        assert_eq!(
            collected.outcome,
            Some(SessionOutcome::Failed {
                message: crate::defaults::session::FAILURE_MESSAGE.into()
            })
        );
    }

    #[tokio::test]
    async fn handshake_can_be_cancelled() {
        let handle = open_session(
            Arc::new(StalledTransport),
            ChatRequest::new("hi"),
            DecoderConfig::default(),
        );
        let cancel = handle.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let collected = tokio::time::timeout(Duration::from_secs(1), handle.collect())
            .await
            .unwrap();
        assert_eq!(collected.outcome, Some(SessionOutcome::Cancelled));
    }
}
