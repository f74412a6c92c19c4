//! Core functionality for the relay server.
//!
//! This module contains fundamental components used throughout the application:
//! - Configuration management
//! - Error handling
//! - Logging context and payload diagnostics
//! - Metrics collection
//! - HTTP middleware

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod error_types;
pub mod logging;
pub mod metrics;
pub mod middleware;

// Re-export commonly used types
pub use config::{AppConfig, CredentialSource, ProviderEndpoints, RetryConfig, ServerConfig};
pub use diagnostics::Diagnostics;
pub use error::{AppError, Result};
pub use logging::{generate_request_id, get_request_id, get_route_context};
pub use metrics::{get_metrics, init_metrics, Metrics};
pub use middleware::{request_id_middleware, MetricsMiddleware};
