//! Moralis NFT API adapter

use super::{ProviderConfig, ProviderDefaults, Session};
use crate::error::Result;
use crate::http::CallRequest;
use crate::pagination::{CursorStrategy, FetchOutcome};
use crate::retry::{BulkOutcome, BulkRetryRunner, ItemOperation};
use crate::types::{JsonObject, JsonValue};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Moralis host
pub const MORALIS_HOST: &str = "deep-index.moralis.io";

const DEFAULTS: ProviderDefaults = ProviderDefaults {
    host: MORALIS_HOST,
    rate_limit: 1.0,
    page_size: 50,
};

/// Client for the Moralis deep-index API
#[derive(Debug)]
pub struct MoralisClient {
    session: Session,
}

impl MoralisClient {
    /// Create a client. An API key is required.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.require_api_key("moralis")?.to_string();
        let headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("x-api-key".to_string(), api_key),
        ];
        Ok(Self {
            session: Session::new(config, &DEFAULTS, headers)?,
        })
    }

    fn strategy(&self) -> CursorStrategy {
        CursorStrategy::with_page_size(self.session.page_size)
    }

    /// Every NFT transfer an address took part in
    pub async fn nft_transfers(
        &self,
        address: &str,
        chain: &str,
        format: Option<&str>,
        direction: Option<&str>,
    ) -> Result<FetchOutcome> {
        let base = self
            .session
            .request(format!("/api/v2/{address}/nft/transfers"))
            .query("chain", chain)
            .query_opt("format", format)
            .query_opt("direction", direction);

        self.session
            .driver("moralis nft transfers")
            .run(&base, &self.strategy())
            .await
    }

    /// Every NFT in a contract
    pub async fn contract_nfts(
        &self,
        address: &str,
        chain: &str,
        format: Option<&str>,
    ) -> Result<FetchOutcome> {
        let base = self
            .session
            .request(format!("/api/v2/nft/{address}"))
            .query("chain", chain)
            .query_opt("format", format);

        self.session
            .driver("moralis contract nfts")
            .run(&base, &self.strategy())
            .await
    }

    /// Metadata of one token.
    ///
    /// Each name in `extract_fields` is copied from the token's `metadata`
    /// JSON string to the top level of the returned object, as `null` when
    /// the metadata lacks it.
    pub async fn token_metadata(
        &self,
        contract: &str,
        token_id: &str,
        chain: &str,
        format: Option<&str>,
        extract_fields: &[String],
    ) -> Result<JsonValue> {
        let request = self
            .session
            .request(format!("/api/v2/nft/{contract}/{token_id}"))
            .query("chain", chain)
            .query_opt("format", format);

        let record = self
            .session
            .fetch_one(&request, "moralis token metadata")
            .await?;
        Ok(lift_metadata_fields(record, extract_fields))
    }

    /// Metadata of many tokens, retrying failures
    pub async fn many_token_metadata(
        &self,
        contract: &str,
        token_ids: Vec<String>,
        chain: &str,
        format: Option<&str>,
        extract_fields: &[String],
    ) -> BulkOutcome<String, JsonValue> {
        let runner = BulkRetryRunner::new(self.session.config.retry_config("moralis metadata"));
        let mut operation = MetadataFetch {
            client: self,
            contract,
            chain,
            format,
            extract_fields,
        };
        runner.run(token_ids, &mut operation).await
    }

    /// Ask Moralis to re-read one token's metadata URI.
    ///
    /// Returns whether Moralis reported the resync as completed.
    pub async fn resync_metadata(&self, contract: &str, token_id: &str, chain: &str) -> Result<bool> {
        let request = self.resync_request(contract, token_id, chain);
        let result = self.session.executor.execute(&request).await?;

        let status = result
            .payload()
            .and_then(|p| p.as_json())
            .and_then(|v| v.get("status"))
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        debug!("Resync response for token_id {}: {:?}", token_id, result.outcome);
        if status.as_deref() == Some("completed") {
            Ok(true)
        } else {
            warn!(
                "Did not receive the expected 'completed' response when resyncing metadata for token_id {}",
                token_id
            );
            Ok(false)
        }
    }

    /// Resync many tokens, pausing `delay` after each one.
    ///
    /// Resync endpoints are throttled harder than the rest of the API.
    pub async fn resync_many(
        &self,
        contract: &str,
        token_ids: Vec<String>,
        chain: &str,
        delay: Option<Duration>,
    ) -> BulkOutcome<String, ()> {
        let mut config = self.session.config.retry_config("moralis resync");
        config.item_delay = delay;
        let runner = BulkRetryRunner::new(config);

        info!("Resyncing metadata for {} tokens", token_ids.len());
        let mut operation = ResyncOperation {
            client: self,
            contract,
            chain,
        };
        runner.run(token_ids, &mut operation).await
    }

    fn resync_request(&self, contract: &str, token_id: &str, chain: &str) -> CallRequest {
        self.session
            .request(format!("/api/v2/nft/{contract}/{token_id}/metadata/resync"))
            .query("chain", chain)
            .query("flag", "uri")
            .query("mode", "sync")
    }
}

/// Copy requested fields out of the `metadata` JSON string
fn lift_metadata_fields(record: JsonValue, fields: &[String]) -> JsonValue {
    let JsonValue::Object(mut object) = record else {
        return record;
    };
    if fields.is_empty() {
        return JsonValue::Object(object);
    }

    let metadata: JsonObject = match object.get("metadata") {
        Some(JsonValue::String(raw)) => match serde_json::from_str(raw) {
            Ok(JsonValue::Object(parsed)) => parsed,
            Ok(_) | Err(_) => {
                warn!("Token metadata is not a JSON object; extracted fields will be null");
                JsonObject::new()
            }
        },
        Some(JsonValue::Object(parsed)) => parsed.clone(),
        _ => JsonObject::new(),
    };

    for field in fields {
        let value = metadata.get(field).cloned().unwrap_or(JsonValue::Null);
        object.insert(field.clone(), value);
    }
    JsonValue::Object(object)
}

struct MetadataFetch<'a> {
    client: &'a MoralisClient,
    contract: &'a str,
    chain: &'a str,
    format: Option<&'a str>,
    extract_fields: &'a [String],
}

impl ItemOperation<String, JsonValue> for MetadataFetch<'_> {
    fn attempt<'b>(&'b mut self, token_id: &'b String) -> BoxFuture<'b, anyhow::Result<JsonValue>> {
        async move {
            let value = self
                .client
                .token_metadata(
                    self.contract,
                    token_id,
                    self.chain,
                    self.format,
                    self.extract_fields,
                )
                .await?;
            Ok(value)
        }
        .boxed()
    }
}

struct ResyncOperation<'a> {
    client: &'a MoralisClient,
    contract: &'a str,
    chain: &'a str,
}

impl ItemOperation<String, ()> for ResyncOperation<'_> {
    fn attempt<'b>(&'b mut self, token_id: &'b String) -> BoxFuture<'b, anyhow::Result<()>> {
        async move {
            if self
                .client
                .resync_metadata(self.contract, token_id, self.chain)
                .await?
            {
                Ok(())
            } else {
                anyhow::bail!("resync of token {token_id} did not complete")
            }
        }
        .boxed()
    }
}
