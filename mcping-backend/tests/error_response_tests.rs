use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use mcping_backend::circuit_breaker::CircuitBreakerConfig;
use mcping_backend::config::Config;
use mcping_backend::lookup::{LookupError, StatusLookup};
use mcping_backend::pipeline::{PipelineConfig, StatusPipeline};
use mcping_backend::retry::RetryConfig;
use mcping_backend::turnstile::TurnstileVerifier;
use mcping_backend::{AppState, create_app};
use mcping_motd::ValidationOptions;
use mcping_store::{ServerAddress, ServerStatus};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Lookup that always fails the same way
struct FailingLookup(LookupError);

#[async_trait]
impl StatusLookup for FailingLookup {
    async fn lookup(&self, _address: &ServerAddress) -> Result<ServerStatus, LookupError> {
        Err(self.0.clone())
    }
}

/// Lookup that hangs until its own query timeout fires
struct SlowTimeoutLookup(Duration);

#[async_trait]
impl StatusLookup for SlowTimeoutLookup {
    async fn lookup(&self, _address: &ServerAddress) -> Result<ServerStatus, LookupError> {
        tokio::time::sleep(self.0).await;
        Err(LookupError::Timeout)
    }
}

struct FixedVerifier(bool);

#[async_trait]
impl TurnstileVerifier for FixedVerifier {
    async fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> bool {
        self.0
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        ..RetryConfig::default()
    }
}

fn create_test_app(
    lookup: LookupError,
    turnstile: Option<bool>,
    circuit_breaker: Option<CircuitBreakerConfig>,
) -> axum::Router {
    let config = PipelineConfig {
        retry: fast_retry(),
        circuit_breaker,
        ..PipelineConfig::default()
    };
    let verifier = turnstile.map(|ok| Arc::new(FixedVerifier(ok)) as Arc<dyn TurnstileVerifier>);
    let pipeline = StatusPipeline::new(
        config,
        Arc::new(FailingLookup(lookup)),
        verifier,
        CancellationToken::new(),
    );
    let state = AppState {
        pipeline: Arc::new(pipeline),
        motd_options: ValidationOptions::default(),
    };
    create_app(state, 64 * 1024, Duration::from_secs(30))
}

async fn send_request(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method("POST")
        .header("X-Forwarded-For", "198.51.100.4")
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, json)
}

#[tokio::test]
async fn test_error_response_for_invalid_hostname() {
    // GIVEN: A running application
    let app = create_test_app(LookupError::Unavailable, None, None);

    // WHEN: Checking a hostname with spaces
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "not a host" }),
    )
    .await;

    // THEN: Should return 400 with an error and a readable message
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());
    let message = body["message"].as_str().unwrap();
    assert!(
        message.contains("invalid characters"),
        "Error message: {}",
        message
    );
}

#[tokio::test]
async fn test_error_response_for_port_out_of_range() {
    // GIVEN: A running application
    let app = create_test_app(LookupError::Unavailable, None, None);

    // WHEN: Sending port 70000
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "mc.hypixel.net", "port": 70000 }),
    )
    .await;

    // THEN: Should return 400 naming the range
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("65535"));
}

#[tokio::test]
async fn test_dns_failure_is_not_found() {
    // GIVEN: A lookup that cannot resolve the name
    let app = create_test_app(LookupError::Dns, None, None);

    // WHEN: Checking a server
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "missing.example.com" }),
    )
    .await;

    // THEN: Should return 404
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Could not resolve hostname"));
}

#[tokio::test]
async fn test_timeout_is_gateway_timeout() {
    // GIVEN: A lookup that times out
    let app = create_test_app(LookupError::Timeout, None, None);

    // WHEN: Checking a server
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "slow.example.com" }),
    )
    .await;

    // THEN: Should return 504
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body.get("message").is_some());
}

#[tokio::test]
async fn test_slow_upstream_with_retries_is_gateway_timeout() {
    // GIVEN: Default timings scaled down, where three slow attempts plus
    // back-off outlast the request timeout
    let config = Config {
        request_timeout: Duration::from_millis(300),
        query_timeout: Duration::from_millis(100),
        ..Config::default()
    };
    let pipeline_config = PipelineConfig {
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            ..RetryConfig::default()
        },
        lookup_deadline: Some(config.lookup_deadline()),
        ..PipelineConfig::default()
    };
    let pipeline = StatusPipeline::new(
        pipeline_config,
        Arc::new(SlowTimeoutLookup(config.query_timeout)),
        None,
        CancellationToken::new(),
    );
    let state = AppState {
        pipeline: Arc::new(pipeline),
        motd_options: ValidationOptions::default(),
    };
    let app = create_app(state, config.request_body_limit, config.request_timeout);

    // WHEN: Checking a server
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "slow.example.com" }),
    )
    .await;

    // THEN: The pipeline answers 504 with a message before the HTTP timeout
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body.get("message").is_some());
}

#[tokio::test]
async fn test_upstream_rate_limit_is_too_many_requests() {
    // GIVEN: An upstream that is rate limiting us
    let app = create_test_app(LookupError::RateLimited, None, None);

    // WHEN: Checking a server
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "busy.example.com" }),
    )
    .await;

    // THEN: Should return 429 without a countdown
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body.get("remainingTime").is_none());
}

#[tokio::test]
async fn test_offline_server_is_not_an_error() {
    // GIVEN: A server that is reachable but offline
    let app = create_test_app(LookupError::Offline, None, None);

    // WHEN: Checking it
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "down.example.com" }),
    )
    .await;

    // THEN: Should return 200 with online false
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["server"]["online"], json!(false));
}

#[tokio::test]
async fn test_missing_turnstile_token_is_forbidden() {
    // GIVEN: Turnstile gating enabled
    let app = create_test_app(LookupError::Unavailable, Some(true), None);

    // WHEN: Checking without a token
    let (status, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "mc.hypixel.net" }),
    )
    .await;

    // THEN: Should return 403
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn test_rejected_turnstile_token_is_forbidden() {
    // GIVEN: A verifier that rejects every token
    let app = create_test_app(LookupError::Unavailable, Some(false), None);

    // WHEN: Checking with a token
    let (status, _body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "mc.hypixel.net", "turnstileToken": "0.abc" }),
    )
    .await;

    // THEN: Should return 403
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_open_circuit_doesnt_expose_internals() {
    // GIVEN: A breaker that opens after one failure and no hostname cooldown
    let breaker = CircuitBreakerConfig {
        failure_threshold: 1,
        timeout: Duration::from_secs(60),
    };
    let app = create_test_app(LookupError::Unavailable, None, Some(breaker));

    // WHEN: Two checks fail upstream, the second against an open circuit
    let (first, _) = send_request(
        app.clone(),
        "/api/status",
        json!({ "hostname": "a.example.com" }),
    )
    .await;
    let (second, body) = send_request(
        app,
        "/api/status",
        json!({ "hostname": "b.example.com" }),
    )
    .await;

    // THEN: Both are 500 with a user-safe message
    assert_eq!(first, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(second, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains("Breaker"), "Should not expose type names");
    assert!(!message.contains("panic"), "Should not expose panic details");
    assert_eq!(message, "Status service is temporarily disabled");
}

#[tokio::test]
async fn test_motd_too_long_is_bad_request() {
    // GIVEN: A running application
    let app = create_test_app(LookupError::Unavailable, None, None);

    // WHEN: Previewing a 257 character MOTD
    let (status, body) = send_request(
        app,
        "/api/motd/preview",
        json!({ "text": "a".repeat(257) }),
    )
    .await;

    // THEN: Should return 400 naming the limit
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("256"));
}

#[tokio::test]
async fn test_unknown_format_is_bad_request() {
    // GIVEN: A running application
    let app = create_test_app(LookupError::Unavailable, None, None);

    // WHEN: Converting to an unsupported dialect
    let (status, body) = send_request(
        app,
        "/api/motd/convert",
        json!({ "text": "§aHi", "format": "forge" }),
    )
    .await;

    // THEN: Should return 400
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("forge"));
}

#[tokio::test]
async fn test_invalid_gradient_color_is_bad_request() {
    // GIVEN: A running application
    let app = create_test_app(LookupError::Unavailable, None, None);

    // WHEN: Using a short hex color
    let (status, body) = send_request(
        app,
        "/api/motd/gradient",
        json!({ "text": "abc", "start": "#FFF", "end": "#000000" }),
    )
    .await;

    // THEN: Should return 400 naming the bad color
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("#FFF"));
}

#[tokio::test]
async fn test_center_width_is_bounded() {
    // GIVEN: A running application
    let app = create_test_app(LookupError::Unavailable, None, None);

    // WHEN: Asking for a huge line width
    let (status, _body) = send_request(
        app,
        "/api/motd/center",
        json!({ "text": "hi", "width": 100000 }),
    )
    .await;

    // THEN: Should return 400
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
