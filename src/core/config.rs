//! Configuration management for the relay server.
//!
//! Everything except provider credentials is read once at startup into an
//! [`AppConfig`] that stays immutable for the lifetime of the process.
//! Credentials are resolved through [`CredentialSource`] on every upstream
//! call so that a rotated key is picked up without a restart.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Origins allowed to call the relay from a browser.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://tigzig.com",
    "https://realtime.tigzig.com",
    "https://rex.tigzig.com",
    "https://rexdb.tigzig.com",
    "https://rexrc.tigzig.com",
    "https://mf.tigzig.com",
    "https://rexdb2.tigzig.com",
    "https://n8n-iii2.onrender.com",
    // Local development
    "http://localhost:8123",
    "http://localhost:5199",
];

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_OPENROUTER_API_BASE: &str = "https://openrouter.ai/api";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server configuration (host, port)
    pub server: ServerConfig,

    /// Base URLs of the upstream providers
    pub providers: ProviderEndpoints,

    /// Where each provider's credential is read from
    pub credentials: Credentials,

    /// Whether to verify SSL certificates for upstream requests
    pub verify_ssl: bool,

    /// Per-attempt timeout for routes without their own budget
    pub request_timeout: Duration,

    /// Per-attempt timeout for the chat-completion route
    pub chat_timeout: Duration,

    /// Retry settings for the chat-completion route
    pub retry: RetryConfig,

    /// CORS allow-list
    pub allowed_origins: Vec<String>,

    /// Log full request/response payloads for every relayed call
    pub log_payloads: bool,
}

/// Server-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream base URLs, one per provider. Paths are appended by the routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub openrouter: String,
    pub gemini: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: DEFAULT_OPENAI_API_BASE.to_string(),
            openrouter: DEFAULT_OPENROUTER_API_BASE.to_string(),
            gemini: DEFAULT_GEMINI_API_BASE.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every provider at the same base URL.
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            openai: base.clone(),
            openrouter: base.clone(),
            gemini: base,
        }
    }
}

/// Source of a provider credential.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read from the named environment variable at call time
    Env(String),
    /// Fixed value
    Static(String),
}

impl CredentialSource {
    pub fn env(var: &str) -> Self {
        Self::Env(var.to_string())
    }

    /// Resolve the current credential value.
    ///
    /// Returns `None` when the variable is unset or empty. Callers still send
    /// the request; the upstream is responsible for rejecting it.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::Env(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
            Self::Static(value) => Some(value.clone()),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(var) => f.debug_tuple("Env").field(var).finish(),
            Self::Static(_) => f.debug_tuple("Static").field(&"***").finish(),
        }
    }
}

/// Credential sources for the three providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openai: CredentialSource,
    pub openrouter: CredentialSource,
    pub gemini: CredentialSource,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            openai: CredentialSource::env("OPENAI_API_KEY"),
            openrouter: CredentialSource::env("OPENROUTER_API_KEY"),
            gemini: CredentialSource::env("GEMINI_API_KEY"),
        }
    }
}

/// Retry settings. Delays are expressed in backoff units of `unit` length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per logical call, first attempt included
    pub max_attempts: u32,

    /// Exponential multiplier, in units
    pub multiplier: u32,

    /// Shortest wait between attempts, in units
    pub min_units: u32,

    /// Longest wait between attempts, in units
    pub max_units: u32,

    /// Length of one backoff unit
    pub unit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1,
            min_units: 4,
            max_units: 10,
            unit: Duration::from_millis(default_backoff_unit_ms()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: ProviderEndpoints::default(),
            credentials: Credentials::default(),
            verify_ssl: default_verify_ssl(),
            request_timeout: Duration::from_secs(default_request_timeout()),
            chat_timeout: Duration::from_secs(default_chat_timeout()),
            retry: RetryConfig::default(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
            log_payloads: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_chat_timeout() -> u64 {
    60
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to defaults.
    ///
    /// Unparseable values are ignored with a warning rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("PORT") {
            config.server.port = port;
        }
        if let Ok(verify_ssl) = std::env::var("VERIFY_SSL") {
            config.verify_ssl = str_to_bool(&verify_ssl);
        }
        if let Some(secs) = env_parse::<u64>("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("CHAT_TIMEOUT_SECS") {
            config.chat_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("RETRY_BACKOFF_UNIT_MS") {
            config.retry.unit = Duration::from_millis(ms);
        }
        if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins(&origins);
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.providers.openai = trim_base(&base);
        }
        if let Ok(base) = std::env::var("OPENROUTER_API_BASE") {
            config.providers.openrouter = trim_base(&base);
        }
        if let Ok(base) = std::env::var("GEMINI_API_BASE") {
            config.providers.gemini = trim_base(&base);
        }
        if let Ok(flag) = std::env::var("LOG_PAYLOADS") {
            config.log_payloads = str_to_bool(&flag);
        }

        config
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}

fn trim_base(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
