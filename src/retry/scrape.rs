//! Scrape sessions
//!
//! A scrape session is per-item work that holds an external resource, such
//! as a browser. It must be closed however the run ends.

use super::runner::{BulkOutcome, BulkRetryRunner, ItemOperation};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Per-item operation owning a resource that needs releasing
pub trait ScrapeSession<I, T>: ItemOperation<I, T> {
    /// Release the session's resources
    fn close(&mut self) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Run `session` over `items` with retries, then close it.
///
/// The session is closed on every exit path. A panic inside an attempt is
/// resumed after the close; a failing close is logged.
pub async fn run_scrape<I, T, S>(
    session: &mut S,
    items: Vec<I>,
    runner: &BulkRetryRunner,
) -> BulkOutcome<I, T>
where
    I: fmt::Debug,
    S: ScrapeSession<I, T> + ?Sized,
{
    let result = AssertUnwindSafe(runner.run(items, &mut *session))
        .catch_unwind()
        .await;

    match session.close().await {
        Ok(()) => debug!("{}: scrape session closed", runner.config().label),
        Err(e) => warn!(
            "{}: failed to close scrape session: {:#}",
            runner.config().label,
            e
        ),
    }

    match result {
        Ok(outcome) => outcome,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
