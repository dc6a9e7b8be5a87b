//! Bulk retry module
//!
//! Drives per-item operations (one metadata call or one page scrape per
//! item) through a bounded number of passes over the failing subset, and
//! reports what never succeeded in [`BulkOutcome::permanently_failed`].

mod runner;
mod scrape;

pub use runner::{
    BulkOutcome, BulkRetryRunner, FailedItem, ItemOperation, RetryConfig, DEFAULT_MAX_PASSES,
};
pub use scrape::{run_scrape, ScrapeSession};

#[cfg(test)]
mod tests;
