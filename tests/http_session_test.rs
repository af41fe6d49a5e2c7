//! HTTP session tests against a mock chat service
//!
//! Exercise the full path: request shape, body decoding, metadata, failure
//! mapping and cancellation.

use std::time::Duration;

use chat_sieve::prelude::*;
use futures::StreamExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ChatClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .build()
        .unwrap();
    ChatClient::new(config).unwrap()
}

#[tokio::test]
async fn streams_answer_and_metadata() {
    let server = MockServer::start().await;
    let body = "[/INST] Pour réinitialiser votre mot de passe, ouvrez Paramètres.</s>\n\
                __METADATA__{\"type\": \"metadata\", \"confidence\": 0.82, \"relatedTickets\": [\"T-12\"]}__END__";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(serde_json::json!({"message": "mot de passe"})))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let collected = client_for(&server)
        .send_message("mot de passe")
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        collected.text,
        "Pour réinitialiser votre mot de passe, ouvrez Paramètres."
    );
    assert!(collected.is_completed());
}

#[tokio::test]
async fn metadata_without_end_marker() {
    let server = MockServer::start().await;
    let body = "Bonjour\n__METADATA__{\"confidence\":0.87,\"related_tickets\":[\"A\",\"B\"]}__END__";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let mut handle = client_for(&server).send_message("salut").unwrap();
    let mut events = Vec::new();
    while let Some(event) = handle.next().await {
        events.push(event);
    }

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::ContentDelta { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Bonjour");
    let metadata: Vec<&Metadata> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Metadata { metadata } => Some(metadata),
            _ => None,
        })
        .collect();
    assert_eq!(
        metadata,
        vec![&Metadata::new(0.87).with_related_tickets(vec!["A".into(), "B".into()])]
    );
    assert_eq!(events.last(), Some(&StreamEvent::Completed));
}

#[tokio::test]
async fn server_error_fails_with_fixed_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let collected = client_for(&server).send_message("hi").unwrap().collect().await;
    assert_eq!(collected.text, "");
    assert_eq!(
        collected.outcome,
        Some(SessionOutcome::Failed {
            message: chat_sieve::defaults::session::FAILURE_MESSAGE.to_string()
        })
    );
}

#[tokio::test]
async fn failure_message_is_configurable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .failure_message("Erreur lors de la communication avec le serveur.")
        .build()
        .unwrap();
    let collected = ChatClient::new(config)
        .unwrap()
        .send_message("hi")
        .unwrap()
        .collect()
        .await;
    assert_eq!(
        collected.outcome,
        Some(SessionOutcome::Failed {
            message: "Erreur lors de la communication avec le serveur.".to_string()
        })
    );
}

#[tokio::test]
async fn unreachable_service_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .connect_timeout(Some(Duration::from_secs(2)))
        .build()
        .unwrap();
    let client = ChatClient::new(config).unwrap();

    let collected = client.send_message("hi").unwrap().collect().await;
    assert!(matches!(
        collected.outcome,
        Some(SessionOutcome::Failed { .. })
    ));
    assert!(!client.check_health().await);
}

#[tokio::test]
async fn cancel_during_slow_handshake() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let handle = client_for(&server).send_message("hi").unwrap();
    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let collected = tokio::time::timeout(Duration::from_secs(2), handle.collect())
        .await
        .expect("cancellation should end the session promptly");
    assert_eq!(collected.text, "");
    assert_eq!(collected.outcome, Some(SessionOutcome::Cancelled));
}

#[tokio::test]
async fn health_reports_readiness() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "ok", "chatbot_ready": true})),
        )
        .mount(&server)
        .await;
    assert!(client_for(&server).check_health().await);
}

#[tokio::test]
async fn health_false_when_model_not_loaded_or_broken() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "ok", "chatbot_ready": false})),
        )
        .mount(&server)
        .await;
    assert!(!client_for(&server).check_health().await);

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&broken)
        .await;
    assert!(!client_for(&broken).check_health().await);

    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&down)
        .await;
    assert!(!client_for(&down).check_health().await);
}

#[tokio::test]
async fn sink_receives_callbacks() {
    #[derive(Default)]
    struct Transcript {
        text: String,
        confidence: Option<f64>,
        done: bool,
    }

    impl EventSink for Transcript {
        fn on_chunk(&mut self, delta: &str) {
            self.text.push_str(delta);
        }
        fn on_metadata(&mut self, metadata: &Metadata) {
            self.confidence = Some(metadata.confidence);
        }
        fn on_complete(&mut self) {
            self.done = true;
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Voici la réponse.\n__METADATA__{\"confidence\": 0.4}__END__",
        ))
        .mount(&server)
        .await;

    let handle = client_for(&server).send_message("question").unwrap();
    let mut transcript = Transcript::default();
    let outcome = dispatch(handle, &mut transcript).await;

    assert_eq!(outcome, Some(SessionOutcome::Completed));
    assert_eq!(transcript.text, "Voici la réponse.");
    assert_eq!(transcript.confidence, Some(0.4));
    assert!(transcript.done);
}
