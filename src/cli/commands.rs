//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rate-limited bulk retrieval from NFT and blockchain APIs
#[derive(Parser, Debug)]
#[command(name = "chainfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Write JSON lines here instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Exit successfully even when a fetch stopped early
    #[arg(long, global = true)]
    pub allow_partial: bool,

    /// Stop paginated fetches after this many records
    #[arg(long, global = true)]
    pub max_records: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Providers
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Moralis deep-index API
    Moralis {
        #[command(subcommand)]
        command: MoralisCommand,
    },

    /// Tatum API
    Tatum {
        #[command(subcommand)]
        command: TatumCommand,
    },

    /// OpenSea metadata API and asset pages
    Opensea {
        #[command(subcommand)]
        command: OpenSeaCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum MoralisCommand {
    /// NFT transfers an address took part in
    Transfers {
        address: String,

        #[arg(long, default_value = "eth")]
        chain: String,

        /// decimal or hex
        #[arg(long)]
        format: Option<String>,

        /// to, from or both
        #[arg(long)]
        direction: Option<String>,
    },

    /// All NFTs of a contract
    ContractNfts {
        address: String,

        #[arg(long, default_value = "eth")]
        chain: String,

        #[arg(long)]
        format: Option<String>,
    },

    /// Metadata of one or more tokens
    Metadata {
        contract: String,

        #[arg(required = true)]
        token_ids: Vec<String>,

        #[arg(long, default_value = "eth")]
        chain: String,

        #[arg(long)]
        format: Option<String>,

        /// Metadata field to lift to the top level (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Resync token metadata from the token URI
    Resync {
        contract: String,

        #[arg(required = true)]
        token_ids: Vec<String>,

        #[arg(long, default_value = "eth")]
        chain: String,

        /// Pause after each token, in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum TatumCommand {
    /// Current Ethereum block number
    CurrentBlock {
        /// Testnet name sent as x-testnet-type
        #[arg(long)]
        testnet: Option<String>,
    },

    /// Multitoken transactions of an account on a contract
    Transactions {
        account: String,
        contract: String,

        #[arg(long, default_value = "ETH")]
        chain: String,

        #[arg(long)]
        from: Option<u64>,

        #[arg(long)]
        to: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum OpenSeaCommand {
    /// Metadata of one or more tokens by OpenSea identifier
    Metadata {
        contract: String,

        #[arg(required = true)]
        identifiers: Vec<String>,

        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Asset page URLs for tokens
    AssetUrls {
        contract: String,

        #[arg(required = true)]
        token_ids: Vec<String>,

        #[arg(long, default_value = "ethereum")]
        network: String,
    },
}
