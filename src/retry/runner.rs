//! Bulk retry runner
//!
//! For per-item work without native pagination: attempt every item, then
//! retry only the failures, for a bounded number of passes. Items that never
//! succeed are reported, not dropped.

use crate::progress::{ProgressConfig, ProgressTracker};
use crate::types::BackoffType;
use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Default number of passes over the failing items
pub const DEFAULT_MAX_PASSES: u32 = 3;

/// One unit of per-item work
pub trait ItemOperation<I, T>: Send {
    /// Attempt the item once
    fn attempt<'a>(&'a mut self, item: &'a I) -> BoxFuture<'a, anyhow::Result<T>>;
}

impl<I, T, F> ItemOperation<I, T> for F
where
    F: FnMut(&I) -> BoxFuture<'static, anyhow::Result<T>> + Send,
{
    fn attempt<'a>(&'a mut self, item: &'a I) -> BoxFuture<'a, anyhow::Result<T>> {
        self(item)
    }
}

/// Retry settings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Passes over the input, the first included
    pub max_passes: u32,
    /// Pause after every attempt, successful or not
    pub item_delay: Option<Duration>,
    /// Backoff between passes
    pub pass_backoff: BackoffType,
    /// First pass backoff; zero disables the wait
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub progress: ProgressConfig,
    /// Name used in log lines
    pub label: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            item_delay: None,
            pass_backoff: BackoffType::Constant,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::from_secs(60),
            progress: ProgressConfig::with_step(5),
            label: "bulk".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn max_passes(mut self, passes: u32) -> Self {
        self.max_passes = passes;
        self
    }

    #[must_use]
    pub fn backoff(mut self, kind: BackoffType, initial: Duration) -> Self {
        self.pass_backoff = kind;
        self.initial_backoff = initial;
        self
    }
}

/// An item that failed every pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem<I> {
    pub item: I,
    pub attempts: u32,
    pub last_error: String,
}

/// Result of a bulk run
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome<I, T> {
    /// Successful items with their values, in input order
    pub succeeded: Vec<(I, T)>,
    /// Items still failing after the last pass, in input order
    pub permanently_failed: Vec<FailedItem<I>>,
}

impl<I, T> BulkOutcome<I, T> {
    /// Whether every item succeeded
    pub fn is_complete(&self) -> bool {
        self.permanently_failed.is_empty()
    }

    /// The successful values, in input order
    pub fn into_values(self) -> Vec<T> {
        self.succeeded.into_iter().map(|(_, value)| value).collect()
    }
}

/// Runs an [`ItemOperation`] over a set of items with pass-level retries
#[derive(Debug, Clone, Default)]
pub struct BulkRetryRunner {
    config: RetryConfig,
}

impl BulkRetryRunner {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Attempt every item, retrying failures on later passes
    pub async fn run<I, T, Op>(&self, items: Vec<I>, operation: &mut Op) -> BulkOutcome<I, T>
    where
        I: fmt::Debug,
        Op: ItemOperation<I, T> + ?Sized,
    {
        let label = &self.config.label;
        let max_passes = self.config.max_passes.max(1);
        let mut tracker = ProgressTracker::new(
            self.config.progress,
            Some(items.len() as u64),
            label.clone(),
        );

        let mut remaining: Vec<(usize, I, String)> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index, item, String::new()))
            .collect();
        let mut succeeded: Vec<(usize, I, T)> = Vec::new();
        let mut passes = 0;

        while passes < max_passes && !remaining.is_empty() {
            if passes > 0 {
                let delay = self.config.pass_backoff.delay(
                    passes - 1,
                    self.config.initial_backoff,
                    self.config.max_backoff,
                );
                info!(
                    "{}: retrying {} failed items (pass {} of {})",
                    label,
                    remaining.len(),
                    passes + 1,
                    max_passes
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            passes += 1;

            let mut failed = Vec::new();
            for (index, item, _) in remaining {
                let attempt = operation.attempt(&item).await;
                match attempt {
                    Ok(value) => {
                        succeeded.push((index, item, value));
                        tracker.update(succeeded.len() as u64);
                    }
                    Err(e) => {
                        warn!("{}: attempt {} failed for {:?}: {:#}", label, passes, item, e);
                        failed.push((index, item, format!("{e:#}")));
                    }
                }
                if let Some(delay) = self.config.item_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            remaining = failed;
        }

        tracker.finish();
        if !remaining.is_empty() {
            warn!(
                "{}: {} items still failing after {} passes",
                label,
                remaining.len(),
                passes
            );
        }

        succeeded.sort_by_key(|(index, _, _)| *index);
        BulkOutcome {
            succeeded: succeeded
                .into_iter()
                .map(|(_, item, value)| (item, value))
                .collect(),
            permanently_failed: remaining
                .into_iter()
                .map(|(_, item, last_error)| FailedItem {
                    item,
                    attempts: passes,
                    last_error,
                })
                .collect(),
        }
    }
}
