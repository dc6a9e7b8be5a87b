//! Tatum API adapter

use super::{ProviderConfig, ProviderDefaults, Session};
use crate::error::{Error, Result};
use crate::pagination::{FetchOutcome, OffsetStrategy};
use crate::types::JsonValue;

/// Default Tatum host
pub const TATUM_HOST: &str = "api-us-west1.tatum.io";

const DEFAULTS: ProviderDefaults = ProviderDefaults {
    host: TATUM_HOST,
    rate_limit: 5.0,
    page_size: 50,
};

/// Client for the Tatum v3 API
#[derive(Debug)]
pub struct TatumClient {
    session: Session,
}

impl TatumClient {
    /// Create a client. An API key is required.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.require_api_key("tatum")?.to_string();
        let headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ("x-api-key".to_string(), api_key),
        ];
        Ok(Self {
            session: Session::new(config, &DEFAULTS, headers)?,
        })
    }

    /// Current Ethereum block number.
    ///
    /// `testnet` (e.g. `ethereum-sepolia`) goes out as an `x-testnet-type`
    /// header on this call only.
    pub async fn current_block(&self, testnet: Option<&str>) -> Result<u64> {
        let mut request = self.session.request("/v3/ethereum/block/current");
        if let Some(testnet) = testnet {
            request = request.header("x-testnet-type", testnet);
        }

        let record = self
            .session
            .fetch_one(&request, "tatum current block")
            .await?;
        parse_block_number(&record)
    }

    /// All transactions of `account` on a multitoken (ERC-1155) contract
    pub async fn multitoken_transactions(
        &self,
        account: &str,
        contract: &str,
        chain: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<FetchOutcome> {
        let base = self
            .session
            .request(format!(
                "/v3/multitoken/transaction/{chain}/{account}/{contract}"
            ))
            .query_opt("from", from_block.map(|b| b.to_string()))
            .query_opt("to", to_block.map(|b| b.to_string()));

        self.session
            .driver("tatum multitoken transactions")
            .run(&base, &OffsetStrategy::with_page_size(self.session.page_size))
            .await
    }
}

/// A block number arrives as a JSON number or as plain text
fn parse_block_number(value: &JsonValue) -> Result<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::decode(format!("unexpected block number: {value}")))
}
