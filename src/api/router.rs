//! Route table and HTTP layers.

use crate::api::handlers::{
    chat_completion, create_session, gemini_chat_completion, health, metrics_handler,
    open_router_completion, AppState,
};
use crate::core::middleware::{request_id_middleware, MetricsMiddleware, REQUEST_ID_HEADER};
use axum::{
    http::{HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the router with all relay, health and metrics endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/session", get(create_session))
        .route("/open-chat-completion", post(chat_completion))
        .route("/open-router-completion", post(open_router_completion))
        .route("/gemini-chat-completion", post(gemini_chat_completion))
        .with_state(state)
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS for a fixed origin allow-list with credentials.
///
/// Credentialed CORS forbids `*`, so methods and headers are mirrored from the
/// preflight request instead.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
