//! Integration tests for the /api/chat relay endpoint.
//!
//! Verifies that:
//! - An unknown model name returns 404 with zero upstream connections
//! - A malformed `data` payload returns 400 carrying the decode error
//! - A missing `data` parameter returns 400
//! - A known model relays the upstream stream as one JSON-enveloped SSE
//!   frame per chunk, with the SSE content type set before any body bytes
//! - An upstream rejection at connection time surfaces as HTTP 502

use std::sync::Arc;

use axum::body::Body;
use http::Request;
use tower::ServiceExt;
use wiremock::matchers::{any, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prism::config::{ApiKey, ProvidersConfig};
use prism::provider::ProviderRegistry;
use prism::relay::{create_router, AppState};

/// Build a prism test app with provider base URLs pointed at mock servers.
fn test_app(openai_base: &str, gemini_base: &str) -> axum::Router {
    let providers = ProvidersConfig {
        openai_api_key: ApiKey::from("test-openai-key"),
        google_ai_key: ApiKey::from("test-google-key"),
        openai_base_url: openai_base.to_string(),
        gemini_base_url: gemini_base.to_string(),
    };

    let registry = ProviderRegistry::new(reqwest::Client::new(), &providers);

    create_router(AppState {
        registry: Arc::new(registry),
    })
}

/// Percent-encode a query parameter value.
fn urlencode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// A well-formed `data` query value.
fn prompt_json() -> String {
    r#"{"prompt":"tell me a story","instructions":{"role":"system","prompt":"be brief"}}"#
        .to_string()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn unknown_model_is_404_with_no_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = test_app(&upstream.uri(), &upstream.uri());
    let uri = format!(
        "/api/chat?model=unknown-llm&data={}",
        urlencode(&prompt_json())
    );
    let request = Request::get(&uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("Unknown model"), "body: {body}");
    // MockServer verifies the expect(0) on drop.
}

#[tokio::test]
async fn malformed_data_is_400_with_decode_error() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = test_app(&upstream.uri(), &upstream.uri());
    let uri = format!("/api/chat?model=gpt3.5&data={}", urlencode("{not json"));
    let request = Request::get(&uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("invalid prompt payload"), "body: {body}");
}

#[tokio::test]
async fn missing_data_is_400() {
    let upstream = MockServer::start().await;
    let app = test_app(&upstream.uri(), &upstream.uri());

    let request = Request::get("/api/chat?model=gpt3.5")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delta_provider_stream_is_relayed_with_json_envelope() {
    let upstream = MockServer::start().await;

    let sse_body = concat!(
        "data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-3.5-turbo",
            "stream": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test_app(&upstream.uri(), &upstream.uri());
    let uri = format!("/api/chat?model=gpt3.5&data={}", urlencode(&prompt_json()));
    let request = Request::get(&uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(
        response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );

    let body = body_string(response).await;
    assert_eq!(
        body,
        concat!(
            "data: {\"text\":\"\"}\n\n",
            "data: {\"text\":\"Hel\"}\n\n",
            "data: {\"text\":\"lo\"}\n\n",
        )
    );
}

#[tokio::test]
async fn candidate_provider_stream_is_relayed_with_json_envelope() {
    let upstream = MockServer::start().await;

    let sse_body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Once upon\"}],\"role\":\"model\"},\"index\":0}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" a time\"}],\"role\":\"model\"},\"finishReason\":\"STOP\",\"index\":0}]}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test_app(&upstream.uri(), &upstream.uri());
    let uri = format!(
        "/api/chat?model=gemini-1.5-flash&data={}",
        urlencode(&prompt_json())
    );
    let request = Request::get(&uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let body = body_string(response).await;
    assert_eq!(
        body,
        concat!(
            "data: {\"text\":\"Once upon\"}\n\n",
            "data: {\"text\":\" a time\"}\n\n",
        )
    );
}

#[tokio::test]
async fn upstream_rejection_is_502() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test_app(&upstream.uri(), &upstream.uri());
    let uri = format!("/api/chat?model=gpt3.5&data={}", urlencode(&prompt_json()));
    let request = Request::get(&uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::BAD_GATEWAY);
    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("openai returned 401"),
        "body: {body}"
    );
}

#[tokio::test]
async fn truncated_upstream_stream_relays_prefix_then_closes() {
    let upstream = MockServer::start().await;

    // Upstream ends without [DONE]: the relay forwards what it got and
    // closes the body without a synthetic terminal event.
    let sse_body = concat!(
        "data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"partial\"},\"finish_reason\":null}]}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&upstream)
        .await;

    let app = test_app(&upstream.uri(), &upstream.uri());
    let uri = format!("/api/chat?model=gpt3.5&data={}", urlencode(&prompt_json()));
    let request = Request::get(&uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(body, "data: {\"text\":\"partial\"}\n\n");
}
