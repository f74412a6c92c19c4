//! Mock-based tests for provider API interactions.
//!
//! These tests use wiremock to stand in for OpenAI, OpenRouter and Gemini and
//! drive the relay end to end through the real HTTP upstream client.

mod common;

use axum::http::StatusCode;
use common::{call, call_json, get, post_json, test_config, GEMINI_KEY, OPENAI_KEY, OPENROUTER_KEY};
use llm_relay::{
    api::{build_router, AppState, HttpUpstream},
    core::{init_metrics, AppConfig},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Create a test app whose providers all point at the mock server
fn create_test_app(config: AppConfig) -> axum::Router {
    init_metrics();
    let upstream = HttpUpstream::from_config(&config).expect("Failed to build HTTP client");
    build_router(Arc::new(AppState::new(config, Arc::new(upstream))))
}

fn chat_request() -> serde_json::Value {
    json!({
        "model": "gpt-4o-mini",
        "messages": [{"role": "user", "content": "Hello"}]
    })
}

fn chat_response() -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello! How can I help you?"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 9, "total_tokens": 19}
    })
}

#[tokio::test]
async fn test_session_request_reaches_realtime_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/realtime/sessions"))
        .and(header("authorization", format!("Bearer {}", OPENAI_KEY).as_str()))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "gpt-4o-realtime-preview",
            "voice": "alloy",
            "temperature": 0.6,
            "turn_detection": {"type": "server_vad", "threshold": 0.7}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sess_001",
            "object": "realtime.session",
            "client_secret": {"value": "ek_abc", "expires_at": 1700000000}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(
        app,
        get("/session?model=gpt-4o-realtime-preview&voice=alloy"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_secret"]["value"], "ek_abc");
}

#[tokio::test]
async fn test_successful_chat_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {}", OPENAI_KEY).as_str()))
        .and(body_json(chat_request()))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(app, post_json("/open-chat-completion", &chat_request())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, chat_response());
}

#[tokio::test]
async fn test_chat_provider_error_is_passed_through() {
    let mock_server = MockServer::start().await;

    let error_body = json!({
        "error": {
            "message": "Internal server error",
            "type": "server_error",
            "code": 500
        }
    });
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(app, post_json("/open-chat-completion", &chat_request())).await;

    // Any decodable upstream reply ends the call, whatever its status
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, error_body);
}

#[tokio::test]
async fn test_chat_timeout_returns_timeout_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.chat_timeout = Duration::from_millis(50);
    let app = create_test_app(config);

    let (status, bytes) = call(app, post_json("/open-chat-completion", &chat_request())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"error":"Request timed out while waiting for OpenAI response"}"#
    );
}

#[tokio::test]
async fn test_chat_invalid_json_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Bad Gateway</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(app, post_json("/open-chat-completion", &chat_request())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["error"]["message"],
        "Invalid JSON response from upstream provider"
    );
}

#[tokio::test]
async fn test_chat_unreachable_upstream_returns_fallback() {
    // Nothing listens on the discard port.
    let app = create_test_app(test_config("http://127.0.0.1:9"));
    let (status, body) = call_json(app, post_json("/open-chat-completion", &chat_request())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Request failed after multiple retries"}));
}

#[tokio::test]
async fn test_open_router_completion() {
    let mock_server = MockServer::start().await;

    let payload = json!({
        "model": "anthropic/claude-3.5-sonnet",
        "messages": [{"role": "user", "content": "Hello"}]
    });
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {}", OPENROUTER_KEY).as_str()))
        .and(body_json(payload.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(app, post_json("/open-router-completion", &payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, chat_response());
}

#[tokio::test]
async fn test_open_router_timeout_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.request_timeout = Duration::from_millis(50);
    let app = create_test_app(config);

    let (status, body) = call_json(app, post_json("/open-router-completion", &chat_request())).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["type"], "timeout_error");
}

#[tokio::test]
async fn test_gemini_chat_completion() {
    let mock_server = MockServer::start().await;

    let payload = json!({
        "model": "gemini-1.5-pro",
        "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
    });
    let candidates = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "Hi!"}]},
            "finishReason": "STOP"
        }]
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(query_param("key", GEMINI_KEY))
        .and(body_json(payload.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidates.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(app, post_json("/gemini-chat-completion", &payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, candidates);
}

#[tokio::test]
async fn test_gemini_default_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", GEMINI_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, body) = call_json(
        app,
        post_json("/gemini-chat-completion", &json!({"contents": []})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"candidates": []}));
}

#[tokio::test]
async fn test_gemini_error_body_does_not_leak_key_in_relay_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server.uri()));
    let (status, bytes) = call(
        app,
        post_json("/gemini-chat-completion", &json!({"contents": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!String::from_utf8(bytes).unwrap().contains(GEMINI_KEY));
}
