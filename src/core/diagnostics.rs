//! Payload diagnostics for relayed calls.
//!
//! Logs the full inbound payload before the upstream call and the decoded
//! upstream body after it, tagged by route. Nothing here returns an error:
//! a payload that cannot be rendered is logged as such and the call proceeds.

use crate::core::logging::get_request_id;
use serde_json::Value;

/// Structured before/after logger for relay payloads.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log the payload a route is about to relay.
    pub fn log_request(&self, route: &str, payload: &Value) {
        if !self.enabled {
            return;
        }
        if let Some(rendered) = render_payload(route, payload) {
            tracing::info!(
                request_id = %get_request_id(),
                route = %route,
                payload = %rendered,
                "{} - REQUEST",
                route
            );
        }
    }

    /// Log what came back for a relayed call.
    pub fn log_response(&self, route: &str, status: Option<u16>, payload: &Value) {
        if !self.enabled {
            return;
        }
        if let Some(rendered) = render_payload(route, payload) {
            tracing::info!(
                request_id = %get_request_id(),
                route = %route,
                status = ?status,
                payload = %rendered,
                "{} - RESPONSE",
                route
            );
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Pretty-print a payload, logging and discarding any rendering failure.
pub fn render_payload(route: &str, payload: &Value) -> Option<String> {
    match serde_json::to_string_pretty(payload) {
        Ok(rendered) => Some(rendered),
        Err(error) => {
            tracing::error!(route = %route, error = %error, "Error logging request/response");
            None
        }
    }
}
