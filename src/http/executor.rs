//! Single-call executor
//!
//! Issues exactly one request per [`CallRequest`]:
//! - validates the method and URL before touching the network
//! - waits on the session's rate-limit gate
//! - sends with the session default headers plus per-call overrides
//! - decodes the body by content type
//! - converts transport and decode failures into a [`CallResult`]

use super::rate_limit::{CallGate, IntervalLimiter};
use super::request::CallRequest;
use super::response::{CallOutcome, CallResult};
use crate::decode::decode_body;
use crate::error::{Error, Result};
use crate::types::Scheme;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default rate limit in calls per second
pub const DEFAULT_RATE_LIMIT: f64 = 5.0;

/// Configuration for a call executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// URL scheme for every call
    pub scheme: Scheme,
    /// Request timeout
    pub timeout: Duration,
    /// Calls per second allowed through the default gate
    pub rate_limit: f64,
    /// Default headers for all requests (API key, accept, ...)
    pub default_headers: Vec<(String, String)>,
    /// User agent string
    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Https,
            timeout: DEFAULT_TIMEOUT,
            rate_limit: DEFAULT_RATE_LIMIT,
            default_headers: Vec::new(),
            user_agent: format!("chainfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ExecutorConfig {
    /// Create a new config builder
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }
}

/// Builder for executor config
#[derive(Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Set the URL scheme
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the rate limit in calls per second
    pub fn rate_limit(mut self, rate: f64) -> Self {
        self.config.rate_limit = rate;
        self
    }

    /// Add a default header; a repeated name replaces the earlier value
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        let headers = &mut self.config.default_headers;
        match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => headers.push((key, value)),
        }
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}

/// Executes one call at a time through a rate-limit gate
pub struct CallExecutor {
    client: Client,
    config: ExecutorConfig,
    default_headers: HeaderMap,
    gate: Arc<dyn CallGate>,
}

impl CallExecutor {
    /// Create an executor with its own interval limiter
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let gate = Arc::new(IntervalLimiter::new(config.rate_limit)?);
        Self::with_gate(config, gate)
    }

    /// Create an executor backed by an existing gate, e.g. a shared limiter
    pub fn with_gate(config: ExecutorConfig, gate: Arc<dyn CallGate>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let default_headers = build_header_map(&config.default_headers)?;

        Ok(Self {
            client,
            config,
            default_headers,
            gate,
        })
    }

    /// The executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The gate every call waits on
    pub fn gate(&self) -> &Arc<dyn CallGate> {
        &self.gate
    }

    /// Execute exactly one call.
    ///
    /// Returns `Err` only for problems detected before any I/O (unsupported
    /// method, malformed URL or header); those consume no rate-limit slot.
    /// Every network or decode failure comes back as a [`CallResult`].
    pub async fn execute(&self, request: &CallRequest) -> Result<CallResult> {
        if !request.method.is_supported() {
            return Err(Error::UnsupportedMethod {
                method: request.method.to_string(),
            });
        }
        let url = request.url(self.config.scheme)?;
        let overrides = build_header_map(&request.header_overrides)?;

        // Per-call overrides replace defaults for this request only
        let mut headers = self.default_headers.clone();
        for (name, value) in &overrides {
            headers.insert(name.clone(), value.clone());
        }

        let mut req = self
            .client
            .request(request.method.into(), url.clone())
            .headers(headers);

        if request.method.sends_body() {
            if let Some(ref body) = request.body {
                req = req.body(body.clone());
            }
        }

        self.gate.wait_until_allowed(true).await;

        let start = Instant::now();
        let url_str = url.to_string();

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Something went wrong while retrieving data from {}: {}",
                    url_str, e
                );
                return Ok(CallResult {
                    url: url_str,
                    outcome: CallOutcome::TransportFailure(describe_transport_error(&e)),
                    status: None,
                    content_type: None,
                    elapsed: start.elapsed(),
                });
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let outcome = match response.bytes().await {
            Ok(body) => match decode_body(content_type.as_deref(), &body) {
                Ok(payload) => CallOutcome::Success(payload),
                Err(e) => {
                    warn!("Could not decode response from {}: {}", url_str, e);
                    CallOutcome::DecodeFailure(e.to_string())
                }
            },
            Err(e) => {
                warn!("Failed to read response body from {}: {}", url_str, e);
                CallOutcome::TransportFailure(describe_transport_error(&e))
            }
        };

        let elapsed = start.elapsed();
        debug!(
            "{} {} -> {} in {:.3}s",
            request.method,
            url_str,
            status,
            elapsed.as_secs_f64()
        );

        Ok(CallResult {
            url: url_str,
            outcome,
            status: Some(status),
            content_type,
            elapsed,
        })
    }

    /// Execute a GET for `host` and `path` with the given query
    pub async fn get<'a>(
        &self,
        host: &str,
        path: &str,
        query: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<CallResult> {
        let mut request = CallRequest::new(host, path);
        for (k, v) in query {
            request = request.query(k, v);
        }
        self.execute(&request).await
    }
}

impl std::fmt::Debug for CallExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallExecutor")
            .field("config", &self.config)
            .field("interval", &self.gate.interval())
            .finish_non_exhaustive()
    }
}

/// Build a header map, rejecting names or values that cannot go on the wire
fn build_header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Classify a reqwest error for the failure message
fn describe_transport_error(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection error"
    } else if e.is_body() || e.is_decode() {
        "body error"
    } else {
        "request error"
    };
    format!("{kind}: {e}")
}
