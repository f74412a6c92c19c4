//! LLM Relay - a small relay server for third-party LLM provider APIs
//!
//! The relay exposes a stable set of local endpoints and forwards each call to
//! exactly one upstream provider, injecting server-held credentials:
//!
//! - `GET /session` → OpenAI realtime sessions
//! - `POST /open-chat-completion` → OpenAI chat completions, with bounded retry
//! - `POST /open-router-completion` → OpenRouter chat completions
//! - `POST /gemini-chat-completion` → Gemini `generateContent`
//!
//! # Architecture
//!
//! - [`core`]: configuration, errors, logging context, metrics, middleware
//! - [`api`]: HTTP handlers, route table and the upstream client
//! - [`services`]: the retry policy
//!
//! # Configuration
//!
//! Provider credentials are read from `OPENAI_API_KEY`, `OPENROUTER_API_KEY`
//! and `GEMINI_API_KEY` on every call. Optional environment variables:
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8000)
//! - `REQUEST_TIMEOUT_SECS`: Per-attempt upstream timeout (default: 30)
//! - `CHAT_TIMEOUT_SECS`: Per-attempt timeout for chat completions (default: 60)
//! - `CORS_ALLOWED_ORIGINS`: Comma separated origin allow-list

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{build_router, AppState, HttpUpstream, Upstream};
pub use crate::core::{AppConfig, AppError, Result};
pub use services::RetryPolicy;
