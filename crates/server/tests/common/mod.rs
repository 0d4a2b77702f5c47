//! Common test utilities for E2E testing with a mock engine.
//!
//! Provides a test fixture that creates an in-process server with the mock
//! engine injected, so the whole HTTP surface can be exercised without a
//! real ffmpeg install.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use wavepress_core::testing::MockEngine;
use wavepress_core::{Config, ConversionPhase, Orchestrator, StatusCallback, TranscodeEngine};
use wavepress_server::api::{create_router, WsBroadcaster};
use wavepress_server::state::AppState;

/// Multipart boundary used by [`TestFixture::upload`].
const BOUNDARY: &str = "wavepress-test-boundary";

/// Test fixture for E2E testing with a mock engine.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock engine - script outputs, inject failures, inspect calls
    pub engine: Arc<MockEngine>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(config: Config) -> Self {
        let engine = Arc::new(MockEngine::new());
        let engine_handle: Arc<dyn TranscodeEngine> = engine.clone();

        let ws_broadcaster = WsBroadcaster::default();
        let callback_broadcaster = ws_broadcaster.clone();
        let status_callback: StatusCallback =
            Arc::new(move |phase: ConversionPhase, status_line: &str| {
                callback_broadcaster.status_update(phase.as_str(), status_line);
            });
        let orchestrator = Arc::new(
            Orchestrator::new(
                engine_handle,
                config.conversion.clone(),
                config.intake.clone(),
            )
            .with_status_callback(status_callback),
        );

        let state = Arc::new(AppState::new(config, orchestrator, ws_broadcaster));
        let router = create_router(state);

        Self { router, engine }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Upload a file as multipart form data.
    pub async fn upload(&self, file_name: &str, content_type: &str, bytes: &[u8]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/file")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(file_name, content_type, bytes)))
            .unwrap();

        self.send(request).await
    }

    /// Send a GET request and return the raw response (for downloads).
    pub async fn get_raw(&self, path: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        (status, headers, body)
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);

        let request = if let Some(body) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            builder.body(Body::from(body.to_string())).unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

fn multipart_body(file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
