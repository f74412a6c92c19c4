//! Upstream request construction and execution.
//!
//! An [`UpstreamRequest`] is assembled once per relayed call and handed to an
//! [`Upstream`] implementation, which performs exactly one POST per
//! [`Upstream::send`] and reports the result as an [`AttemptOutcome`]. Retrying
//! is not this module's concern.

use crate::core::error::{AppError, Result};
use crate::core::error_types::{
    OUTCOME_CONNECT_ERROR, OUTCOME_DECODE_ERROR, OUTCOME_NETWORK_ERROR, OUTCOME_SUCCESS,
    OUTCOME_TIMEOUT,
};
use crate::core::metrics::get_metrics;
use crate::core::{logging::get_request_id, AppConfig};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::fmt;
use std::time::{Duration, Instant};

/// Authentication mode for an upstream provider request.
#[derive(Clone, Copy)]
pub enum UpstreamAuth<'a> {
    /// `Authorization: Bearer <key>` header
    Bearer(&'a str),
    /// `?key=<key>` query parameter
    QueryKey(&'a str),
}

/// A single outbound POST. The same request is reused for every attempt.
#[derive(Clone, PartialEq)]
pub struct UpstreamRequest {
    url: Url,
    headers: BTreeMap<String, String>,
    body: Value,
    timeout: Duration,
}

impl UpstreamRequest {
    /// Build a JSON POST to `url`. The body is forwarded verbatim.
    pub fn new(url: &str, body: Value, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| {
            AppError::Internal(format!("Invalid upstream URL configuration: {}", e))
        })?;

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Ok(Self {
            url,
            headers,
            body,
            timeout,
        })
    }

    /// Attach provider credentials.
    pub fn with_auth(mut self, auth: UpstreamAuth<'_>) -> Self {
        match auth {
            UpstreamAuth::Bearer(api_key) => {
                self.headers
                    .insert("Authorization".to_string(), format!("Bearer {}", api_key));
            }
            UpstreamAuth::QueryKey(api_key) => {
                self.url.query_pairs_mut().append_pair("key", api_key);
            }
        }
        self
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL without query string, safe to log.
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.as_str(), "Bearer ***")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("UpstreamRequest")
            .field("method", &"POST")
            .field("url", &self.redacted_url())
            .field("headers", &headers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A completed HTTP round-trip. Any status code counts.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection could not be established
    Connect,
    /// Response arrived but its body is not valid JSON
    Decode,
    /// Connection reset or any other transport error
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.reason)
    }
}

/// Result of one upstream attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(UpstreamResponse),
    TransportFailure(TransportFailure),
    Timeout,
}

impl AttemptOutcome {
    /// Whether another attempt could change the result.
    ///
    /// A decode failure means the upstream did answer, so it is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptOutcome::Success(_) => false,
            AttemptOutcome::Timeout => true,
            AttemptOutcome::TransportFailure(failure) => failure.kind != FailureKind::Decode,
        }
    }

    /// Outcome label used in metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => OUTCOME_SUCCESS,
            AttemptOutcome::Timeout => OUTCOME_TIMEOUT,
            AttemptOutcome::TransportFailure(failure) => match failure.kind {
                FailureKind::Connect => OUTCOME_CONNECT_ERROR,
                FailureKind::Decode => OUTCOME_DECODE_ERROR,
                FailureKind::Other => OUTCOME_NETWORK_ERROR,
            },
        }
    }

    /// Surface anything but a completed round-trip as a server error.
    pub fn into_result(self) -> Result<UpstreamResponse> {
        match self {
            AttemptOutcome::Success(response) => Ok(response),
            AttemptOutcome::Timeout => Err(AppError::UpstreamTimeout),
            AttemptOutcome::TransportFailure(failure) => Err(failure.into()),
        }
    }
}

impl From<TransportFailure> for AppError {
    fn from(failure: TransportFailure) -> Self {
        match failure.kind {
            FailureKind::Decode => AppError::UpstreamBodyDecode(failure.reason),
            FailureKind::Connect | FailureKind::Other => {
                AppError::UpstreamTransport(failure.reason)
            }
        }
    }
}

/// Something that can perform one upstream POST.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> AttemptOutcome;
}

/// [`Upstream`] backed by a shared `reqwest` client.
///
/// The client pools connections; the per-attempt deadline comes from the
/// request and covers connecting, sending and reading the whole body.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Create the HTTP client with connection pooling.
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: &UpstreamRequest) -> AttemptOutcome {
        let mut builder = self.client.post(request.url.clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let builder = builder.json(request.body());

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };

        match tokio::time::timeout(request.timeout(), exchange).await {
            Err(_) => AttemptOutcome::Timeout,
            Ok(Err(error)) => classify_transport_error(error),
            Ok(Ok((status, bytes))) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(body) => AttemptOutcome::Success(UpstreamResponse { status, body }),
                Err(error) => AttemptOutcome::TransportFailure(TransportFailure::new(
                    FailureKind::Decode,
                    format!("HTTP {} with undecodable body: {}", status, error),
                )),
            },
        }
    }
}

/// Map a `reqwest` error to an attempt outcome, dropping the URL (it may
/// carry a query-string credential).
fn classify_transport_error(error: reqwest::Error) -> AttemptOutcome {
    if error.is_timeout() {
        return AttemptOutcome::Timeout;
    }

    let kind = if error.is_connect() {
        FailureKind::Connect
    } else if error.is_decode() {
        FailureKind::Decode
    } else {
        FailureKind::Other
    };

    let error = error.without_url();
    let reason = match error.source() {
        Some(source) => format!("{}: {}", error, source),
        None => error.to_string(),
    };
    AttemptOutcome::TransportFailure(TransportFailure::new(kind, reason))
}

/// Send one attempt and record its outcome and latency.
pub async fn send_observed(
    upstream: &dyn Upstream,
    route: &str,
    request: &UpstreamRequest,
) -> AttemptOutcome {
    let start = Instant::now();
    let outcome = upstream.send(request).await;
    let elapsed = start.elapsed();

    let metrics = get_metrics();
    metrics
        .upstream_attempts
        .with_label_values(&[route, outcome.label()])
        .inc();
    metrics
        .upstream_latency
        .with_label_values(&[route])
        .observe(elapsed.as_secs_f64());

    match &outcome {
        AttemptOutcome::Success(response) => tracing::debug!(
            request_id = %get_request_id(),
            route = %route,
            url = %request.redacted_url(),
            status = response.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Upstream request completed"
        ),
        AttemptOutcome::Timeout => tracing::warn!(
            request_id = %get_request_id(),
            route = %route,
            url = %request.redacted_url(),
            timeout_ms = request.timeout().as_millis() as u64,
            "Upstream request timed out"
        ),
        AttemptOutcome::TransportFailure(failure) => tracing::warn!(
            request_id = %get_request_id(),
            route = %route,
            url = %request.redacted_url(),
            outcome = outcome.label(),
            error = %failure.reason,
            "Upstream request failed"
        ),
    }

    outcome
}

/// Whether `segment` can be embedded in a URL path without changing its shape.
pub fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '?', '#'])
}
