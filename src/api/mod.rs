//! API layer for the relay server.
//!
//! This module contains the HTTP handlers, the route table, request models
//! and the upstream client the handlers relay through.

pub mod handlers;
pub mod models;
pub mod router;
pub mod upstream;

// Re-export commonly used types
pub use handlers::{
    chat_completion, create_session, gemini_chat_completion, health, metrics_handler,
    open_router_completion, AppState,
};
pub use models::{SessionParams, SessionRequest};
pub use router::{build_router, cors_layer};
pub use upstream::{
    AttemptOutcome, FailureKind, HttpUpstream, TransportFailure, Upstream, UpstreamAuth,
    UpstreamRequest, UpstreamResponse,
};
