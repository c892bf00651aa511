//! HttpTransport against a mock OpenAI-compatible server

use serde_json::json;
use sheetsmith_providers::remote::{ChatMessage, CompletionRequest, CompletionTransport};
use sheetsmith_providers::{HttpTransport, ProviderError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "deepseek/deepseek-chat-v3-0324:free".into(),
        messages: vec![ChatMessage::user("build it")],
        temperature: 0.3,
        max_tokens: 4000,
    }
}

async fn transport_for(server: &MockServer) -> HttpTransport {
    HttpTransport::new(
        &format!("{}/api/v1", server.uri()),
        Some("sk-test".into()),
        "OPENROUTER_API_KEY",
    )
    .unwrap()
}

#[tokio::test]
async fn returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "deepseek/deepseek-chat-v3-0324:free",
            "max_tokens": 4000,
            "messages": [{"role": "user", "content": "build it"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "import os"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = transport_for(&server).await.complete(&request()).await;
    assert_eq!(reply, Ok("import os".to_string()));
}

#[tokio::test]
async fn maps_status_codes() {
    let cases = [
        (401, ProviderError::Auth { status: 401 }),
        (403, ProviderError::Auth { status: 403 }),
        (429, ProviderError::Quota { status: 429 }),
        (
            500,
            ProviderError::Http {
                status: 500,
                body: "boom".into(),
            },
        ),
    ];
    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .await
            .complete(&request())
            .await
            .unwrap_err();
        assert_eq!(err, expected, "status {status}");
    }
}

#[tokio::test]
async fn undecodable_bodies_are_malformed() {
    for body in ["not json", r#"{"choices": []}"#, r#"{"choices": [{"message": {}}]}"#] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .await
            .complete(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "malformed-response", "body {body}");
    }
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let transport = HttpTransport::new("http://127.0.0.1:1", Some("k".into()), "K").unwrap();
    let err = transport.complete(&request()).await.unwrap_err();
    assert_eq!(err.kind(), "network");
    assert!(err.is_retryable());
}
