//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, MoralisCommand, OpenSeaCommand, TatumCommand};
use crate::config::{AppConfig, ProviderKind};
use crate::error::{Error, Result};
use crate::pagination::FetchOutcome;
use crate::providers::{asset_page_url, MoralisClient, OpenSeaClient, ProviderConfig, TatumClient};
use crate::retry::BulkOutcome;
use serde_json::{json, Value};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let mut out = self.open_output()?;

        match &self.cli.command {
            Commands::Moralis { command } => self.moralis(&config, command, &mut out).await?,
            Commands::Tatum { command } => self.tatum(&config, command, &mut out).await?,
            Commands::Opensea { command } => self.opensea(&config, command, &mut out).await?,
        }

        out.flush()?;
        Ok(())
    }

    fn load_config(&self) -> Result<AppConfig> {
        match &self.cli.config {
            Some(path) => AppConfig::load(path),
            None => Ok(AppConfig::default()),
        }
    }

    /// Provider settings from the config file; `--max-records` wins
    fn provider_config(&self, config: &AppConfig, kind: ProviderKind) -> Result<ProviderConfig> {
        let mut provider = config.provider_config(kind)?;
        if let Some(max_records) = self.cli.max_records {
            provider.max_records = max_records;
        }
        Ok(provider)
    }

    fn open_output(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.cli.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }

    async fn moralis(
        &self,
        config: &AppConfig,
        command: &MoralisCommand,
        out: &mut dyn Write,
    ) -> Result<()> {
        let client = MoralisClient::new(self.provider_config(config, ProviderKind::Moralis)?)?;

        match command {
            MoralisCommand::Transfers {
                address,
                chain,
                format,
                direction,
            } => {
                let outcome = client
                    .nft_transfers(address, chain, format.as_deref(), direction.as_deref())
                    .await?;
                self.write_fetch(outcome, out)
            }
            MoralisCommand::ContractNfts {
                address,
                chain,
                format,
            } => {
                let outcome = client
                    .contract_nfts(address, chain, format.as_deref())
                    .await?;
                self.write_fetch(outcome, out)
            }
            MoralisCommand::Metadata {
                contract,
                token_ids,
                chain,
                format,
                fields,
            } => {
                let outcome = client
                    .many_token_metadata(contract, token_ids.clone(), chain, format.as_deref(), fields)
                    .await;
                self.write_bulk(outcome, out)
            }
            MoralisCommand::Resync {
                contract,
                token_ids,
                chain,
                delay_ms,
            } => {
                let delay = (*delay_ms > 0).then(|| Duration::from_millis(*delay_ms));
                let outcome = client
                    .resync_many(contract, token_ids.clone(), chain, delay)
                    .await;
                let outcome = BulkOutcome {
                    succeeded: outcome
                        .succeeded
                        .into_iter()
                        .map(|(token_id, ())| {
                            let line = json!({"token_id": token_id, "status": "completed"});
                            (token_id, line)
                        })
                        .collect(),
                    permanently_failed: outcome.permanently_failed,
                };
                self.write_bulk(outcome, out)
            }
        }
    }

    async fn tatum(
        &self,
        config: &AppConfig,
        command: &TatumCommand,
        out: &mut dyn Write,
    ) -> Result<()> {
        let client = TatumClient::new(self.provider_config(config, ProviderKind::Tatum)?)?;

        match command {
            TatumCommand::CurrentBlock { testnet } => {
                let block = client.current_block(testnet.as_deref()).await?;
                write_line(out, &json!({"block": block}))
            }
            TatumCommand::Transactions {
                account,
                contract,
                chain,
                from,
                to,
            } => {
                let outcome = client
                    .multitoken_transactions(account, contract, chain, *from, *to)
                    .await?;
                self.write_fetch(outcome, out)
            }
        }
    }

    async fn opensea(
        &self,
        config: &AppConfig,
        command: &OpenSeaCommand,
        out: &mut dyn Write,
    ) -> Result<()> {
        match command {
            OpenSeaCommand::Metadata {
                contract,
                identifiers,
                format,
            } => {
                let client = OpenSeaClient::new(self.provider_config(config, ProviderKind::OpenSea)?)?;
                let outcome = client
                    .many_token_metadata(contract, identifiers.clone(), Some(format.as_str()))
                    .await;
                self.write_bulk(outcome, out)
            }
            OpenSeaCommand::AssetUrls {
                contract,
                token_ids,
                network,
            } => {
                for token_id in token_ids {
                    let url = asset_page_url(contract, token_id, network)?;
                    write_line(out, &json!({"token_id": token_id, "url": url.as_str()}))?;
                }
                Ok(())
            }
        }
    }

    /// Write a paginated fetch; a partial one fails unless allowed
    fn write_fetch(&self, outcome: FetchOutcome, out: &mut dyn Write) -> Result<()> {
        for record in &outcome.records {
            write_line(out, record)?;
        }
        info!(
            "Wrote {} records from {} pages",
            outcome.records.len(),
            outcome.pages
        );

        if outcome.is_partial() && self.cli.allow_partial {
            if let Some(cause) = outcome.stop_cause() {
                warn!("Fetch incomplete, keeping partial result: {}", cause);
            }
            return Ok(());
        }
        // Records already written stay written
        outcome.into_complete().map(drop)
    }

    /// Write bulk successes; permanent failures fail unless allowed
    fn write_bulk<I: fmt::Display>(
        &self,
        outcome: BulkOutcome<I, Value>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let failed = outcome.permanently_failed.len();
        for failure in &outcome.permanently_failed {
            warn!(
                "Giving up on {} after {} attempts: {}",
                failure.item, failure.attempts, failure.last_error
            );
        }
        let written = outcome.succeeded.len();
        for (_, value) in &outcome.succeeded {
            write_line(out, value)?;
        }
        info!("Wrote {} records, {} items failed", written, failed);

        if failed > 0 && !self.cli.allow_partial {
            return Err(Error::IncompleteFetch {
                records: written,
                cause: format!("{failed} items failed every attempt"),
            });
        }
        Ok(())
    }
}

fn write_line(out: &mut dyn Write, value: &Value) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}
