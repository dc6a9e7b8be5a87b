//! # chainfetch
//!
//! Rate-limited, paginated bulk retrieval from blockchain and NFT metadata
//! APIs (Moralis, Tatum, OpenSea) with progress reporting.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chainfetch::providers::{MoralisClient, ProviderConfig};
//! use chainfetch::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = MoralisClient::new(ProviderConfig::with_api_key("..."))?;
//!
//!     let outcome = client.contract_nfts("0xabc...", "eth", None).await?;
//!     if let Some(cause) = outcome.stop_cause() {
//!         eprintln!("stopped early after {} records: {cause}", outcome.records.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Provider Adapters                         │
//! │        Moralis (cursor)   Tatum (offset)   OpenSea (single)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───────┬─────────────┬───────────┐
//! │  Pagination  │        HTTP           │   Retry     │ Progress  │
//! ├──────────────┼───────────────────────┼─────────────┼───────────┤
//! │ Driver       │ CallExecutor          │ Bulk runner │ Tracker   │
//! │ Cursor       │ Interval limiter      │ Scrape      │ ETA       │
//! │ Offset       │ Shared token bucket   │ sessions    │           │
//! │ Single page  │ Content-type decoding │             │           │
//! └──────────────┴───────────────────────┴─────────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Rate-limited call execution
pub mod http;

/// Content-type aware body decoding
pub mod decode;

/// Pagination strategies and driver
pub mod pagination;

/// Threshold-based progress reporting
pub mod progress;

/// Bulk retries and scrape sessions
pub mod retry;

/// Provider adapters
pub mod providers;

/// Configuration file loading
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use http::{CallExecutor, CallRequest, CallResult};
pub use pagination::{FetchOutcome, PaginationDriver, StopCause, Termination};
pub use retry::{BulkOutcome, BulkRetryRunner};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
