use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use propsearch_common::config::{LlmRoleConfig, RetryConfig};
use propsearch_engine::extract::{CriteriaExtractor, EXTRACTION_TOOL};
use propsearch_engine::llm::{LlmCaller, LlmClient, LlmError, ToolDefinition};

#[derive(Clone)]
struct Provider {
    calls: Arc<AtomicUsize>,
    /// Number of leading calls answered with a 500.
    failures: usize,
    status_override: Option<StatusCode>,
}

async fn openai(State(p): State<Provider>, headers: HeaderMap, Json(req): Json<Value>) -> impl IntoResponse {
    let n = p.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = p.status_override {
        return (status, Json(json!({"error": {"message": "denied"}})));
    }
    if n < p.failures {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"message": "overloaded"}})));
    }
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert_eq!(req["tool_choice"]["function"]["name"], EXTRACTION_TOOL);

    let arguments = json!({"city": "Portland", "state": "OR", "is_search_request": true}).to_string();
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{"message": {"tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": EXTRACTION_TOOL, "arguments": arguments}
            }]}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8}
        })),
    )
}

async fn anthropic(headers: HeaderMap, Json(req): Json<Value>) -> impl IntoResponse {
    assert_eq!(headers["x-api-key"], "sk-ant");
    assert_eq!(req["tool_choice"]["type"], "tool");
    Json(json!({
        "content": [{"type": "tool_use", "id": "t1", "name": req["tool_choice"]["name"], "input": {"city": "Reno"}}],
        "usage": {"input_tokens": 5, "output_tokens": 3}
    }))
}

/// Always rate limited, asking for an hour's wait.
async fn limited(State(p): State<Provider>) -> impl IntoResponse {
    p.calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("retry-after", "3600")],
        Json(json!({"error": {"message": "slow down"}})),
    )
}

async fn start(provider: Provider) -> String {
    let app = Router::new()
        .route("/openai", post(openai))
        .route("/limited", post(limited))
        .route("/anthropic", post(anthropic))
        .with_state(provider);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn role(provider: &str) -> LlmRoleConfig {
    LlmRoleConfig {
        provider: provider.into(),
        model: "test-model".into(),
        max_tokens: 128,
        temperature: Some(0.0),
        timeout_seconds: 5,
    }
}

fn retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        backoff_multiplier: 2.0,
    }
}

fn tool() -> ToolDefinition {
    ToolDefinition {
        name: EXTRACTION_TOOL.into(),
        description: "Record criteria".into(),
        input_schema: json!({"type": "object"}),
    }
}

fn provider(failures: usize, status_override: Option<StatusCode>) -> Provider {
    Provider {
        calls: Arc::new(AtomicUsize::new(0)),
        failures,
        status_override,
    }
}

#[tokio::test]
async fn test_openai_retries_server_errors() {
    let p = provider(1, None);
    let calls = Arc::clone(&p.calls);
    let base = start(p).await;

    let client = LlmClient::with_endpoint(&role("openai"), retry(3), "sk-test", format!("{}/openai", base));
    let out = client.call_tool("sys", "homes in Portland", &tool()).await.unwrap();

    assert_eq!(out.input["city"], "Portland");
    assert_eq!(out.usage.input_tokens, 12);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let p = provider(10, None);
    let calls = Arc::clone(&p.calls);
    let base = start(p).await;

    let client = LlmClient::with_endpoint(&role("openai"), retry(2), "sk-test", format!("{}/openai", base));
    let err = client.call_tool("sys", "q", &tool()).await.unwrap_err();

    assert!(matches!(err, LlmError::Api(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let p = provider(0, Some(StatusCode::UNAUTHORIZED));
    let calls = Arc::clone(&p.calls);
    let base = start(p).await;

    let client = LlmClient::with_endpoint(&role("openai"), retry(3), "sk-test", format!("{}/openai", base));
    let err = client.call_tool("sys", "q", &tool()).await.unwrap_err();

    assert!(matches!(err, LlmError::Auth(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_anthropic_tool_use() {
    let base = start(provider(0, None)).await;

    let client = LlmClient::with_endpoint(&role("anthropic"), retry(1), "sk-ant", format!("{}/anthropic", base));
    let out = client.call_tool("sys", "q", &tool()).await.unwrap();
    assert_eq!(out.input["city"], "Reno");
}

#[tokio::test]
async fn test_extractor_over_http() {
    let base = start(provider(0, None)).await;

    let client = LlmClient::with_endpoint(&role("openai"), retry(1), "sk-test", format!("{}/openai", base));
    let extractor = CriteriaExtractor::new(Some(Arc::new(client) as Arc<dyn LlmCaller>), None);

    let out = extractor.extract("somewhere in Portland").await;
    assert!(out.is_search_request);
    assert_eq!(out.criteria.state, "OR");
}

#[tokio::test]
async fn test_retry_after_is_capped_by_max_backoff() {
    let p = provider(0, None);
    let calls = Arc::clone(&p.calls);
    let base = start(p).await;

    let client = LlmClient::with_endpoint(&role("openai"), retry(2), "sk-test", format!("{}/limited", base));
    let err = tokio::time::timeout(Duration::from_secs(2), client.call_tool("sys", "q", &tool()))
        .await
        .expect("retry waited for the provider's full Retry-After")
        .unwrap_err();

    assert!(matches!(err, LlmError::RateLimited { retry_after: Some(3600) }));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
