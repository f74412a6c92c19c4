//! Logging utilities with request and route context support.
//!
//! Task-local context lets log lines deep inside the relay carry the inbound
//! request id and the route name without threading them through every call.

tokio::task_local! {
    /// Task-local storage for the current route tag (e.g. `OPENAI_CHAT`).
    pub static ROUTE_CONTEXT: String;
}

tokio::task_local! {
    /// Task-local storage for the current request ID.
    ///
    /// Set by the request id middleware for every inbound call.
    pub static REQUEST_ID: String;
}

/// Get the current route tag from context, if set.
///
/// Returns an empty string if no route context is set.
pub fn get_route_context() -> String {
    ROUTE_CONTEXT.try_with(|ctx| ctx.clone()).unwrap_or_default()
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Execute an async block with route context.
///
/// ```ignore
/// with_route_context!("GEMINI", async {
///     // handler logic here
/// })
/// ```
#[macro_export]
macro_rules! with_route_context {
    ($route:expr, $body:expr) => {
        $crate::core::logging::ROUTE_CONTEXT
            .scope($route.to_string(), $body)
            .await
    };
}
