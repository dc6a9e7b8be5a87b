//! Pagination driver
//!
//! Runs one strategy to completion against one executor: ask for the next
//! request, execute it, hand the result back, repeat until the strategy
//! stops or something breaks.

use super::types::{FetchOutcome, PageState, PaginationStrategy, Step, StopCause, Termination};
use crate::error::Result;
use crate::http::{CallExecutor, CallRequest};
use crate::progress::{ProgressConfig, ProgressTracker};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Settings for one driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Name used in log lines
    pub label: String,
    pub progress: ProgressConfig,
    /// Stop after this many records; 0 means no limit
    pub max_records: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            label: "fetch".to_string(),
            progress: ProgressConfig::default(),
            max_records: 0,
        }
    }
}

impl DriverConfig {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Strategy-agnostic pagination loop
#[derive(Debug)]
pub struct PaginationDriver<'a> {
    executor: &'a CallExecutor,
    config: DriverConfig,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(executor: &'a CallExecutor, config: DriverConfig) -> Self {
        Self { executor, config }
    }

    /// Fetch every page `strategy` asks for, starting from `base`.
    ///
    /// Returns `Err` only for request configuration problems. Failures during
    /// the fetch end it with [`Termination::Partial`] and keep every record
    /// received before the failure.
    pub async fn run(
        &self,
        base: &CallRequest,
        strategy: &dyn PaginationStrategy,
    ) -> Result<FetchOutcome> {
        let label = &self.config.label;
        let max_records = self.config.max_records;
        let mut state = PageState::new();
        let mut tracker: Option<ProgressTracker> = None;
        let mut request = strategy.first_request(base);
        let mut issued: HashSet<CallRequest> = HashSet::new();
        issued.insert(request.clone());

        debug!("{}: starting {} pagination", label, strategy.name());

        let termination = loop {
            let result = self.executor.execute(&request).await?;
            let before = state.records.len();
            let step = strategy.advance(&request, result, &mut state);
            let added = state.records.len() - before;

            // Created once the provider reports a total
            if tracker.is_none() {
                if let Some(total) = state.known_total {
                    tracker = Some(ProgressTracker::new(
                        self.config.progress,
                        Some(total),
                        label.clone(),
                    ));
                }
            }

            // Without a total the page count is the only progress signal
            if tracker.is_none() {
                info!(
                    "{}: page {} returned {} records ({} so far)",
                    label,
                    state.pages,
                    added,
                    state.records.len()
                );
            } else if added > 0 {
                debug!(
                    "{}: page {} returned {} records ({} so far)",
                    label,
                    state.pages,
                    added,
                    state.records.len()
                );
            }
            if let Some(tracker) = tracker.as_mut() {
                tracker.update(state.records.len() as u64);
            }

            if max_records > 0 && state.records.len() > max_records {
                state.records.truncate(max_records);
                break Termination::LimitReached;
            }

            match step {
                Step::DoneCleanly => break Termination::Complete,
                Step::DoneWithError(cause) => {
                    warn!(
                        "{}: stopping after {} records: {}",
                        label,
                        state.records.len(),
                        cause
                    );
                    break Termination::Partial(cause);
                }
                Step::HasMore(_) if max_records > 0 && state.records.len() >= max_records => {
                    break Termination::LimitReached;
                }
                Step::HasMore(next) => {
                    if issued.contains(&next) {
                        let cause = StopCause::RepeatedRequest {
                            url: next.url(self.executor.config().scheme)?.to_string(),
                        };
                        warn!("{}: {}", label, cause);
                        break Termination::Partial(cause);
                    }
                    issued.insert(next.clone());
                    request = next;
                }
            }
        };

        match &tracker {
            Some(tracker) => tracker.finish(),
            None => info!(
                "{}: fetched {} records in {} pages",
                label,
                state.records.len(),
                state.pages
            ),
        }

        Ok(FetchOutcome {
            records: state.records,
            termination,
            pages: state.pages,
            known_total: state.known_total,
        })
    }
}
