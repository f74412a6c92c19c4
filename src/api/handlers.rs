//! HTTP request handlers for the relay API.
//!
//! Each relay route targets exactly one upstream. Only the OpenAI chat route
//! wraps its upstream call in a [`RetryPolicy`]; the others send once and
//! surface any failure as a server error.

use crate::api::models::{SessionParams, SessionRequest};
use crate::api::upstream::{
    is_safe_path_segment, send_observed, AttemptOutcome, Upstream, UpstreamAuth,
    UpstreamRequest, UpstreamResponse,
};
use crate::core::config::CredentialSource;
use crate::core::diagnostics::Diagnostics;
use crate::core::error_types::CHAT_TIMEOUT_MESSAGE;
use crate::core::logging::{get_request_id, get_route_context};
use crate::core::metrics::get_metrics;
use crate::core::{AppConfig, AppError, Result};
use crate::services::retry::{RetryOutcome, RetryPolicy};
use crate::with_route_context;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const ROUTE_SESSION: &str = "SESSION";
pub const ROUTE_OPENAI_CHAT: &str = "OPENAI_CHAT";
pub const ROUTE_OPENROUTER: &str = "OPENROUTER";
pub const ROUTE_GEMINI: &str = "GEMINI";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub upstream: Arc<dyn Upstream>,
    pub chat_retry: RetryPolicy,
    pub diagnostics: Diagnostics,
}

impl AppState {
    pub fn new(config: AppConfig, upstream: Arc<dyn Upstream>) -> Self {
        let chat_retry = RetryPolicy::from_config(&config.retry);
        let diagnostics = Diagnostics::new(config.log_payloads);
        Self {
            config: Arc::new(config),
            upstream,
            chat_retry,
            diagnostics,
        }
    }
}

/// Read a provider credential for this call.
///
/// A missing credential is not an error here: the request goes out with an
/// empty key and the upstream's authentication failure is passed back.
fn resolve_credential(source: &CredentialSource, provider: &str) -> String {
    source.resolve().unwrap_or_else(|| {
        tracing::warn!(
            request_id = %get_request_id(),
            route = %get_route_context(),
            provider = %provider,
            credential = ?source,
            "Provider credential is not configured"
        );
        String::new()
    })
}

fn object_payload(body: std::result::Result<Json<Map<String, Value>>, JsonRejection>) -> Result<Value> {
    let Json(payload) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    Ok(Value::Object(payload))
}

fn model_of(payload: &Value) -> Option<&str> {
    payload.get("model").and_then(Value::as_str)
}

/// Send a request once and pass the decoded upstream body through.
async fn relay_once(state: &AppState, route: &str, request: &UpstreamRequest) -> Result<Value> {
    state.diagnostics.log_request(route, request.body());

    let UpstreamResponse { status, body } = send_observed(state.upstream.as_ref(), route, request)
        .await
        .into_result()?;

    state.diagnostics.log_response(route, Some(status), &body);
    tracing::info!(
        request_id = %get_request_id(),
        route = %route,
        status,
        "Upstream call completed"
    );
    Ok(body)
}

/// `GET /session`: create an OpenAI realtime session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<SessionParams>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(params) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    with_route_context!(ROUTE_SESSION, async move {
        tracing::info!(
            request_id = %get_request_id(),
            model = %params.model,
            voice = %params.voice,
            "Received session request"
        );

        let payload = serde_json::to_value(SessionRequest::new(params))
            .map_err(|e| AppError::Internal(format!("Failed to encode session payload: {}", e)))?;
        let api_key = resolve_credential(&state.config.credentials.openai, "openai");
        let request = UpstreamRequest::new(
            &format!("{}/v1/realtime/sessions", state.config.providers.openai),
            payload,
            state.config.request_timeout,
        )?
        .with_auth(UpstreamAuth::Bearer(&api_key));

        relay_once(&state, ROUTE_SESSION, &request).await.map(Json)
    })
}

/// `POST /open-chat-completion`: OpenAI chat completion with bounded retry.
///
/// Exhausted retries are answered with a JSON error body rather than a server
/// error: a timeout on the final attempt yields the timeout message, any other
/// retryable failure yields the policy's fallback value.
pub async fn chat_completion(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>> {
    let payload = object_payload(body)?;

    with_route_context!(ROUTE_OPENAI_CHAT, async move {
        tracing::info!(
            request_id = %get_request_id(),
            model = model_of(&payload).unwrap_or("unknown"),
            "Received OpenAI chat completion request"
        );

        let api_key = resolve_credential(&state.config.credentials.openai, "openai");
        let request = UpstreamRequest::new(
            &format!("{}/v1/chat/completions", state.config.providers.openai),
            payload,
            state.config.chat_timeout,
        )?
        .with_auth(UpstreamAuth::Bearer(&api_key));

        state.diagnostics.log_request(ROUTE_OPENAI_CHAT, request.body());

        let result = state
            .chat_retry
            .execute(ROUTE_OPENAI_CHAT, || {
                send_observed(state.upstream.as_ref(), ROUTE_OPENAI_CHAT, &request)
            })
            .await;

        let (status, body) = match result {
            RetryOutcome::Completed { outcome, attempts } => {
                let UpstreamResponse { status, body } = outcome.into_result()?;
                tracing::info!(
                    request_id = %get_request_id(),
                    route = ROUTE_OPENAI_CHAT,
                    status,
                    attempts,
                    "Chat completion successful"
                );
                (Some(status), body)
            }
            RetryOutcome::Exhausted {
                attempts,
                last_failure: AttemptOutcome::Timeout,
                ..
            } => {
                get_metrics()
                    .fallbacks
                    .with_label_values(&[ROUTE_OPENAI_CHAT, "timeout"])
                    .inc();
                tracing::error!(
                    request_id = %get_request_id(),
                    attempts,
                    "{}",
                    CHAT_TIMEOUT_MESSAGE
                );
                (None, json!({ "error": CHAT_TIMEOUT_MESSAGE }))
            }
            RetryOutcome::Exhausted {
                attempts, fallback, ..
            } => {
                get_metrics()
                    .fallbacks
                    .with_label_values(&[ROUTE_OPENAI_CHAT, "retry_exhausted"])
                    .inc();
                tracing::error!(
                    request_id = %get_request_id(),
                    attempts,
                    "Returning retry fallback body"
                );
                (None, fallback)
            }
        };

        state.diagnostics.log_response(ROUTE_OPENAI_CHAT, status, &body);
        Ok(Json(body))
    })
}

/// `POST /open-router-completion`: single-shot OpenRouter relay.
pub async fn open_router_completion(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>> {
    let payload = object_payload(body)?;

    with_route_context!(ROUTE_OPENROUTER, async move {
        tracing::info!(
            request_id = %get_request_id(),
            model = model_of(&payload).unwrap_or("unknown"),
            "Received OpenRouter completion request"
        );

        let api_key = resolve_credential(&state.config.credentials.openrouter, "openrouter");
        let request = UpstreamRequest::new(
            &format!("{}/v1/chat/completions", state.config.providers.openrouter),
            payload,
            state.config.request_timeout,
        )?
        .with_auth(UpstreamAuth::Bearer(&api_key));

        relay_once(&state, ROUTE_OPENROUTER, &request).await.map(Json)
    })
}

/// `POST /gemini-chat-completion`: single-shot Gemini relay.
///
/// The model is taken from the payload's `model` field and embedded in the
/// upstream path; the API key travels as a query parameter.
pub async fn gemini_chat_completion(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>> {
    let payload = object_payload(body)?;

    with_route_context!(ROUTE_GEMINI, async move {
        let model = match payload.get("model") {
            None => DEFAULT_GEMINI_MODEL.to_string(),
            Some(Value::String(model)) => model.clone(),
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "Invalid model name: expected a string, got {}",
                    other
                )));
            }
        };
        if !is_safe_path_segment(&model) {
            return Err(AppError::BadRequest(format!(
                "Invalid model name: {}",
                model
            )));
        }

        tracing::info!(
            request_id = %get_request_id(),
            model = %model,
            "Received Gemini chat completion request"
        );

        let api_key = resolve_credential(&state.config.credentials.gemini, "gemini");
        let request = UpstreamRequest::new(
            &format!(
                "{}/v1beta/models/{}:generateContent",
                state.config.providers.gemini, model
            ),
            payload,
            state.config.request_timeout,
        )?
        .with_auth(UpstreamAuth::QueryKey(&api_key));

        relay_once(&state, ROUTE_GEMINI, &request).await.map(Json)
    })
}

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Prometheus text exposition of all registered metrics.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(([(CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response())
}
