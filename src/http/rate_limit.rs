//! Rate limiting implementation
//!
//! Two gates share the [`CallGate`] interface:
//!
//! - [`IntervalLimiter`] spaces the calls of one session by a minimum
//!   interval measured from the actual previous call, so time the caller
//!   spends between calls counts toward the wait.
//! - [`SharedRateLimiter`] is a governor token bucket that can be cloned
//!   across sessions which must share one provider quota.

use crate::error::{Error, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Gate every outbound call passes through
#[async_trait]
pub trait CallGate: Send + Sync {
    /// Record that a call happened now
    async fn reset(&self);

    /// Wait until the next call is allowed, optionally recording it
    async fn wait_until_allowed(&self, then_reset: bool);

    /// Minimum spacing this gate enforces
    fn interval(&self) -> Duration;
}

/// Convert a calls-per-second rate into the minimum interval between calls
pub fn interval_for_rate(rate: f64) -> Result<Duration> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(Error::invalid_value(
            "rate_limit",
            format!("expected a positive number of calls per second, got {rate}"),
        ));
    }
    Ok(Duration::from_secs_f64(1.0 / rate))
}

// ============================================================================
// Interval Limiter
// ============================================================================

/// Minimum-interval limiter for one call stream
#[derive(Debug)]
pub struct IntervalLimiter {
    interval: Duration,
    last_call: Mutex<Instant>,
}

impl IntervalLimiter {
    /// Create a limiter allowing `rate` calls per second.
    ///
    /// The limiter starts reset, so the first gated call also waits a full
    /// interval from construction.
    pub fn new(rate: f64) -> Result<Self> {
        let interval = interval_for_rate(rate)?;
        Ok(Self {
            interval,
            last_call: Mutex::new(Instant::now()),
        })
    }
}

#[async_trait]
impl CallGate for IntervalLimiter {
    async fn reset(&self) {
        *self.last_call.lock().await = Instant::now();
    }

    async fn wait_until_allowed(&self, then_reset: bool) {
        // Held across the sleep: concurrent callers queue behind it.
        let mut last_call = self.last_call.lock().await;
        let elapsed = last_call.elapsed();
        if elapsed < self.interval {
            let remaining = self.interval - elapsed;
            debug!("Delaying call for {:?} to respect rate limit", remaining);
            tokio::time::sleep(remaining).await;
        }
        if then_reset {
            *last_call = Instant::now();
        }
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

// ============================================================================
// Shared Token Bucket
// ============================================================================

/// Token bucket rate limiter shared between sessions.
///
/// The bucket holds a single cell, so the next call is allowed one interval
/// after the last call charged to it. That instant is kept alongside the
/// bucket to wait without charging a call.
#[derive(Clone)]
pub struct SharedRateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    last_charged: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl SharedRateLimiter {
    /// Create a shared limiter allowing `rate` calls per second with no burst
    pub fn new(rate: f64) -> Result<Self> {
        let interval = interval_for_rate(rate)?;
        let quota = Quota::with_period(interval)
            .ok_or_else(|| Error::invalid_value("rate_limit", "interval rounds to zero"))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            limiter: Arc::new(Governor::direct(quota)),
            last_charged: Arc::new(Mutex::new(None)),
            interval,
        })
    }

    /// Take the next cell, waiting for it when the bucket is empty
    async fn charge(&self) {
        let mut last_charged = self.last_charged.lock().await;
        if self.limiter.check().is_err() {
            debug!("Shared rate limit reached, waiting for the next cell");
            self.limiter.until_ready().await;
        }
        *last_charged = Some(Instant::now());
    }
}

#[async_trait]
impl CallGate for SharedRateLimiter {
    /// Charge a call to the bucket. With no cell free this waits for the
    /// next one, so the call still counts against the shared quota.
    async fn reset(&self) {
        self.charge().await;
    }

    async fn wait_until_allowed(&self, then_reset: bool) {
        if then_reset {
            self.charge().await;
            return;
        }

        let last_charged = *self.last_charged.lock().await;
        if let Some(last) = last_charged {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                debug!("Delaying call for {:?} to respect shared rate limit", remaining);
                tokio::time::sleep(remaining).await;
            }
        }
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for SharedRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRateLimiter")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
