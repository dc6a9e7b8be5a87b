//! Provider adapters
//!
//! Each adapter knows one provider's host, headers, paths and response
//! shape, and hands the actual work to the generic engine:
//!
//! - [`MoralisClient`]: cursor pagination, token metadata, metadata resync
//! - [`TatumClient`]: offset pagination, current block
//! - [`OpenSeaClient`]: token metadata, asset page URLs for scrape sessions

mod moralis;
mod opensea;
mod tatum;

pub use moralis::{MoralisClient, MORALIS_HOST};
pub use opensea::{asset_page_url, scrape_assets, AssetPage, OpenSeaClient, OPENSEA_HOST};
pub use tatum::{TatumClient, TATUM_HOST};

use crate::error::{Error, Result};
use crate::http::{CallExecutor, CallRequest, ExecutorConfig};
use crate::pagination::{DriverConfig, FetchOutcome, PaginationDriver, SinglePageStrategy};
use crate::progress::ProgressConfig;
use crate::retry::{RetryConfig, DEFAULT_MAX_PASSES};
use crate::types::{JsonValue, Scheme};
use std::time::Duration;

/// Settings one provider session is built from
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Resolved API key
    pub api_key: Option<String>,
    /// Host override, e.g. a mock server's `127.0.0.1:port`
    pub host: Option<String>,
    pub scheme: Scheme,
    /// Calls per second; the provider default when unset
    pub rate_limit: Option<f64>,
    pub page_size: Option<u32>,
    pub timeout: Option<Duration>,
    pub progress: ProgressConfig,
    /// Passes for bulk operations
    pub max_passes: u32,
    /// Stop paginated fetches after this many records; 0 means no limit
    pub max_records: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: None,
            scheme: Scheme::Https,
            rate_limit: None,
            page_size: None,
            timeout: None,
            progress: ProgressConfig::default(),
            max_passes: DEFAULT_MAX_PASSES,
            max_records: 0,
        }
    }
}

impl ProviderConfig {
    /// Config with an API key and defaults for everything else
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Point the provider at another host and scheme
    #[must_use]
    pub fn endpoint(mut self, scheme: Scheme, host: impl Into<String>) -> Self {
        self.scheme = scheme;
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn rate_limit(mut self, rate: f64) -> Self {
        self.rate_limit = Some(rate);
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// The API key, or a configuration error naming the provider
    fn require_api_key(&self, provider: &str) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::missing_field(format!("{provider}.api_key")))
    }

    fn retry_config(&self, label: &str) -> RetryConfig {
        RetryConfig {
            progress: self.progress,
            ..RetryConfig::labeled(label).max_passes(self.max_passes)
        }
    }
}

/// Provider-specific defaults
struct ProviderDefaults {
    host: &'static str,
    rate_limit: f64,
    page_size: u32,
}

/// Shared pieces of every adapter
#[derive(Debug)]
struct Session {
    executor: CallExecutor,
    host: String,
    page_size: u32,
    config: ProviderConfig,
}

impl Session {
    fn new(
        config: ProviderConfig,
        defaults: &ProviderDefaults,
        headers: Vec<(String, String)>,
    ) -> Result<Self> {
        let mut builder = ExecutorConfig::builder()
            .scheme(config.scheme)
            .rate_limit(config.rate_limit.unwrap_or(defaults.rate_limit));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let page_size = config.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be at least 1"));
        }

        Ok(Self {
            executor: CallExecutor::new(builder.build())?,
            host: config
                .host
                .clone()
                .unwrap_or_else(|| defaults.host.to_string()),
            page_size,
            config,
        })
    }

    fn request(&self, path: impl Into<String>) -> CallRequest {
        CallRequest::new(&self.host, path)
    }

    /// Driver for paginated fetches, honoring the record limit
    fn driver(&self, label: &str) -> PaginationDriver<'_> {
        self.driver_with_limit(label, self.config.max_records)
    }

    fn driver_with_limit(&self, label: &str, max_records: usize) -> PaginationDriver<'_> {
        PaginationDriver::new(
            &self.executor,
            DriverConfig {
                label: label.to_string(),
                progress: self.config.progress,
                max_records,
            },
        )
    }

    /// Run a one-call fetch and return its single record
    async fn fetch_one(&self, request: &CallRequest, label: &str) -> Result<JsonValue> {
        let outcome: FetchOutcome = self
            .driver_with_limit(label, 0)
            .run(request, &SinglePageStrategy)
            .await?;
        outcome
            .into_complete()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::decode(format!("{label}: empty response")))
    }
}
