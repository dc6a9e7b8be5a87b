//! OpenSea adapter
//!
//! Token metadata comes from the public metadata API. Data that only exists
//! on the asset web pages is left to a [`ScrapeSession`] the caller supplies
//! (a browser driver, typically); this module builds the page URLs and runs
//! the session through the same retry contract as the API calls.

use super::{ProviderConfig, ProviderDefaults, Session};
use crate::error::{Error, Result};
use crate::retry::{run_scrape, BulkOutcome, BulkRetryRunner, ItemOperation, RetryConfig, ScrapeSession};
use crate::types::JsonValue;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;
use url::Url;

/// Default OpenSea API host
pub const OPENSEA_HOST: &str = "api.opensea.io";

const WEBSITE_HOST: &str = "opensea.io";

const DEFAULTS: ProviderDefaults = ProviderDefaults {
    host: OPENSEA_HOST,
    rate_limit: 0.5,
    page_size: 50,
};

/// Client for the OpenSea metadata API
#[derive(Debug)]
pub struct OpenSeaClient {
    session: Session,
}

impl OpenSeaClient {
    /// Create a client. The API key is optional.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.push(("X-API-KEY".to_string(), key.to_string()));
        }
        Ok(Self {
            session: Session::new(config, &DEFAULTS, headers)?,
        })
    }

    /// Metadata for one token.
    ///
    /// `identifier` is OpenSea's own token identifier from the token URI,
    /// which is not always the token id.
    pub async fn token_metadata(
        &self,
        contract: &str,
        identifier: &str,
        format: Option<&str>,
    ) -> Result<JsonValue> {
        let request = self
            .session
            .request(format!("/api/v1/metadata/{contract}/{identifier}"))
            .query_opt("format", format);

        self.session
            .fetch_one(&request, "opensea token metadata")
            .await
    }

    /// Metadata for many tokens, retrying failures
    pub async fn many_token_metadata(
        &self,
        contract: &str,
        identifiers: Vec<String>,
        format: Option<&str>,
    ) -> BulkOutcome<String, JsonValue> {
        let runner = BulkRetryRunner::new(self.session.config.retry_config("opensea metadata"));
        let mut operation = MetadataFetch {
            client: self,
            contract,
            format,
        };
        runner.run(identifiers, &mut operation).await
    }
}

struct MetadataFetch<'a> {
    client: &'a OpenSeaClient,
    contract: &'a str,
    format: Option<&'a str>,
}

impl ItemOperation<String, JsonValue> for MetadataFetch<'_> {
    fn attempt<'b>(&'b mut self, identifier: &'b String) -> BoxFuture<'b, anyhow::Result<JsonValue>> {
        async move {
            let value = self
                .client
                .token_metadata(self.contract, identifier, self.format)
                .await?;
            Ok(value)
        }
        .boxed()
    }
}

// ============================================================================
// Asset Pages
// ============================================================================

/// One asset page to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPage {
    pub token_id: String,
    pub url: Url,
}

/// URL of a token's asset page; rinkeby and goerli live on the testnets site.
///
/// Each part is escaped as its own path segment.
pub fn asset_page_url(contract: &str, token_id: &str, network: &str) -> Result<Url> {
    let host = match network {
        "rinkeby" | "goerli" => format!("testnets.{WEBSITE_HOST}"),
        _ => WEBSITE_HOST.to_string(),
    };
    let mut url = Url::parse(&format!("https://{host}/"))?;
    url.path_segments_mut()
        .map_err(|()| Error::Other(format!("cannot build asset path on {host}")))?
        .clear()
        .extend(["assets", network, contract, token_id]);
    Ok(url)
}

/// Scrape the asset pages of `token_ids` with `session`, closing it afterwards
pub async fn scrape_assets<T, S>(
    session: &mut S,
    contract: &str,
    token_ids: Vec<String>,
    network: &str,
    config: RetryConfig,
) -> Result<BulkOutcome<AssetPage, T>>
where
    S: ScrapeSession<AssetPage, T> + ?Sized,
{
    let pages = token_ids
        .into_iter()
        .map(|token_id| {
            let url = asset_page_url(contract, &token_id, network)?;
            Ok(AssetPage { token_id, url })
        })
        .collect::<Result<Vec<_>>>();

    let pages = match pages {
        Ok(pages) => pages,
        Err(e) => {
            if let Err(close_err) = session.close().await {
                warn!("Failed to close scrape session: {:#}", close_err);
            }
            return Err(e);
        }
    };

    let runner = BulkRetryRunner::new(config);
    Ok(run_scrape(session, pages, &runner).await)
}
