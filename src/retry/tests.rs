//! Tests for the bulk retry runner

use super::*;
use crate::types::BackoffType;
use futures::future::BoxFuture;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Fails each listed item a fixed number of times, then succeeds
struct Flaky {
    failures_left: HashMap<u32, u32>,
    attempts: Vec<u32>,
}

impl Flaky {
    fn new(failing: &[(u32, u32)]) -> Self {
        Self {
            failures_left: failing.iter().copied().collect(),
            attempts: Vec::new(),
        }
    }
}

impl ItemOperation<u32, String> for Flaky {
    fn attempt<'a>(&'a mut self, item: &'a u32) -> BoxFuture<'a, anyhow::Result<String>> {
        async move {
            self.attempts.push(*item);
            match self.failures_left.get_mut(item) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    anyhow::bail!("item {item} not ready")
                }
                _ => Ok(format!("value-{item}")),
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_failures_converge_on_second_pass() {
    let runner = BulkRetryRunner::new(RetryConfig::labeled("tokens"));
    let mut op = Flaky::new(&[(3, 1), (7, 1)]);

    let outcome = runner.run((0..10).collect(), &mut op).await;

    assert!(outcome.is_complete());
    let items: Vec<u32> = outcome.succeeded.iter().map(|(i, _)| *i).collect();
    assert_eq!(items, (0..10).collect::<Vec<_>>());
    // Successes are recorded once and never retried
    assert_eq!(op.attempts.len(), 12);
    assert_eq!(&op.attempts[10..], &[3, 7]);
    assert_eq!(outcome.succeeded[3].1, "value-3");
}

#[tokio::test]
async fn test_permanent_failures_are_reported() {
    let runner = BulkRetryRunner::new(RetryConfig::default());
    let mut op = Flaky::new(&[(2, 100), (4, 100)]);

    let outcome = runner.run(vec![1, 2, 3, 4], &mut op).await;

    assert!(!outcome.is_complete());
    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.permanently_failed.len(), 2);

    let failed = &outcome.permanently_failed[0];
    assert_eq!(failed.item, 2);
    assert_eq!(failed.attempts, 3);
    assert_eq!(failed.last_error, "item 2 not ready");
    assert_eq!(outcome.permanently_failed[1].item, 4);

    // 4 + 2 + 2 attempts over three passes
    assert_eq!(op.attempts.len(), 8);
}

#[tokio::test]
async fn test_max_passes_bounds_attempts() {
    let runner = BulkRetryRunner::new(RetryConfig::default().max_passes(5));
    let mut op = Flaky::new(&[(1, 4)]);

    let outcome = runner.run(vec![1], &mut op).await;
    assert!(outcome.is_complete());
    assert_eq!(op.attempts.len(), 5);
}

#[tokio::test]
async fn test_item_delay_applies_to_every_attempt() {
    let config = RetryConfig::default().item_delay(Duration::from_millis(20));
    let runner = BulkRetryRunner::new(config);
    let mut op = Flaky::new(&[]);

    let start = Instant::now();
    let outcome = runner.run(vec![1, 2, 3], &mut op).await;

    assert!(outcome.is_complete());
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_pass_backoff_waits_between_passes() {
    let config =
        RetryConfig::default().backoff(BackoffType::Constant, Duration::from_millis(50));
    let runner = BulkRetryRunner::new(config);
    let mut op = Flaky::new(&[(1, 2)]);

    let start = Instant::now();
    let outcome = runner.run(vec![1], &mut op).await;

    assert!(outcome.is_complete());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_closure_operation() {
    let runner = BulkRetryRunner::default();
    let mut op = |item: &u32| {
        let item = *item;
        async move {
            if item % 2 == 0 {
                Ok(item * 10)
            } else {
                Err(anyhow::anyhow!("odd"))
            }
        }
        .boxed()
    };

    let outcome = runner.run(vec![1, 2, 3, 4], &mut op).await;
    assert_eq!(outcome.succeeded, vec![(2, 20), (4, 40)]);
    assert_eq!(outcome.permanently_failed.len(), 2);
}

#[tokio::test]
async fn test_empty_input() {
    let runner = BulkRetryRunner::default();
    let mut op = Flaky::new(&[]);
    let outcome = runner.run(Vec::new(), &mut op).await;
    assert!(outcome.is_complete());
    assert!(outcome.into_values().is_empty());
}

// ============================================================================
// Scrape Session Tests
// ============================================================================

#[derive(Default)]
struct FakeBrowser {
    fail: HashSet<u32>,
    panic_on: Option<u32>,
    opened_pages: Vec<u32>,
    closed: bool,
}

impl ItemOperation<u32, String> for FakeBrowser {
    fn attempt<'a>(&'a mut self, item: &'a u32) -> BoxFuture<'a, anyhow::Result<String>> {
        async move {
            if self.panic_on == Some(*item) {
                panic!("browser crashed");
            }
            self.opened_pages.push(*item);
            if self.fail.contains(item) {
                anyhow::bail!("timed out loading page {item}");
            }
            Ok(format!("<html>{item}</html>"))
        }
        .boxed()
    }
}

impl ScrapeSession<u32, String> for FakeBrowser {
    fn close(&mut self) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            self.closed = true;
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_scrape_session_closed_after_success() {
    let runner = BulkRetryRunner::default();
    let mut browser = FakeBrowser::default();

    let outcome = run_scrape(&mut browser, vec![1, 2], &runner).await;
    assert!(outcome.is_complete());
    assert!(browser.closed);
}

#[tokio::test]
async fn test_scrape_session_closed_after_permanent_failures() {
    let runner = BulkRetryRunner::default();
    let mut browser = FakeBrowser {
        fail: [2].into_iter().collect(),
        ..FakeBrowser::default()
    };

    let outcome = run_scrape(&mut browser, vec![1, 2, 3], &runner).await;
    assert_eq!(outcome.permanently_failed.len(), 1);
    assert_eq!(outcome.permanently_failed[0].attempts, 3);
    assert!(browser.closed);
}

#[tokio::test]
async fn test_scrape_session_closed_after_panic() {
    let runner = BulkRetryRunner::default();
    let mut browser = FakeBrowser {
        panic_on: Some(2),
        ..FakeBrowser::default()
    };

    let result = std::panic::AssertUnwindSafe(run_scrape(&mut browser, vec![1, 2, 3], &runner))
        .catch_unwind()
        .await;

    assert!(result.is_err());
    assert!(browser.closed);
    assert_eq!(browser.opened_pages, vec![1]);
}
