//! Shared constants for structured API errors and relay fallback bodies.

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";

/// Body message returned by the chat route once the retry budget is spent.
pub const RETRY_EXHAUSTED_MESSAGE: &str = "Request failed after multiple retries";

/// Body message returned by the chat route when the final attempt timed out.
pub const CHAT_TIMEOUT_MESSAGE: &str = "Request timed out while waiting for OpenAI response";

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_TIMEOUT: &str = "timeout";
pub const OUTCOME_CONNECT_ERROR: &str = "connect_error";
pub const OUTCOME_DECODE_ERROR: &str = "decode_error";
pub const OUTCOME_NETWORK_ERROR: &str = "network_error";
