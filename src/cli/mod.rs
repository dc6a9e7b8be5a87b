//! CLI module
//!
//! Command-line interface over the provider adapters.
//!
//! # Commands
//!
//! - `moralis transfers | contract-nfts | metadata | resync`
//! - `tatum current-block | transactions`
//! - `opensea metadata | asset-urls`
//!
//! Records are written as JSON lines to stdout or `--output`.

mod commands;
mod runner;

pub use commands::{Cli, Commands, MoralisCommand, OpenSeaCommand, TatumCommand};
pub use runner::Runner;
