//! Shared utilities for relay integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use llm_relay::{
    api::{build_router, AppState, AttemptOutcome, Upstream, UpstreamRequest, UpstreamResponse},
    core::{
        config::{CredentialSource, Credentials},
        AppConfig, ProviderEndpoints,
    },
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const OPENAI_KEY: &str = "sk-openai-test";
pub const OPENROUTER_KEY: &str = "sk-or-test";
pub const GEMINI_KEY: &str = "gemini-test-key";

/// Upstream that replays a fixed script of outcomes and records every request.
///
/// Once the script runs out the last outcome repeats.
pub struct ScriptedUpstream {
    script: Mutex<VecDeque<AttemptOutcome>>,
    last: Mutex<Option<AttemptOutcome>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedUpstream {
    pub fn new(script: Vec<AttemptOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(outcome: AttemptOutcome) -> Arc<Self> {
        Self::new(vec![outcome])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, request: &UpstreamRequest) -> AttemptOutcome {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| panic!("ScriptedUpstream called with an empty script")),
        }
    }
}

pub fn success(status: u16, body: Value) -> AttemptOutcome {
    AttemptOutcome::Success(UpstreamResponse { status, body })
}

pub fn connect_failure() -> AttemptOutcome {
    AttemptOutcome::TransportFailure(llm_relay::api::TransportFailure::new(
        llm_relay::api::FailureKind::Connect,
        "connection refused",
    ))
}

/// Configuration pointing every provider at `base`, with static credentials
/// and a 1ms backoff unit so retry tests run quickly.
pub fn test_config(base: &str) -> AppConfig {
    let mut config = AppConfig {
        providers: ProviderEndpoints::single(base),
        credentials: Credentials {
            openai: CredentialSource::Static(OPENAI_KEY.to_string()),
            openrouter: CredentialSource::Static(OPENROUTER_KEY.to_string()),
            gemini: CredentialSource::Static(GEMINI_KEY.to_string()),
        },
        ..AppConfig::default()
    };
    config.retry.unit = Duration::from_millis(1);
    config
}

pub fn app_with(config: AppConfig, upstream: Arc<dyn Upstream>) -> Router {
    build_router(Arc::new(AppState::new(config, upstream)))
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

/// Send one request through the router and return status and raw body bytes.
pub async fn call(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

pub async fn call_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = call(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
