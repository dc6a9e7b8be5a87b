//! Threshold-based progress tracker

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Default reporting step in percent
pub const DEFAULT_STEP_PERCENT: u32 = 10;

/// Progress reporting settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Report every time this many percent are crossed (1..=100)
    pub step_percent: u32,
    /// Append an estimate of the remaining time
    pub include_eta: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            step_percent: DEFAULT_STEP_PERCENT,
            include_eta: true,
        }
    }
}

impl ProgressConfig {
    /// Config with the given step, clamped to 1..=100
    pub fn with_step(step_percent: u32) -> Self {
        Self {
            step_percent,
            ..Self::default()
        }
        .normalized()
    }

    /// Enable or disable the remaining-time estimate
    #[must_use]
    pub fn eta(mut self, include_eta: bool) -> Self {
        self.include_eta = include_eta;
        self
    }

    /// Clamp the step into 1..=100
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.step_percent = self.step_percent.clamp(1, 100);
        self
    }
}

/// One emitted progress report
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub processed: u64,
    pub total: u64,
    /// Percent complete, may exceed 100 when a provider undercounts
    pub percent: f64,
    pub elapsed: Duration,
    /// Estimated time left, when requested and computable
    pub remaining: Option<Duration>,
}

impl ProgressEvent {
    /// Human-readable remaining time
    pub fn remaining_display(&self) -> Option<String> {
        self.remaining.map(format_remaining)
    }
}

/// Format a remaining duration: seconds under a minute, else whole minutes
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1} seconds")
    } else {
        format!("{} minutes", remaining.as_secs() / 60)
    }
}

/// Tracks a processed count against a total
#[derive(Debug)]
pub struct ProgressTracker {
    config: ProgressConfig,
    label: String,
    total: Option<u64>,
    processed: u64,
    /// Count of steps already reported; never decreases
    next_threshold: u64,
    started: Instant,
}

impl ProgressTracker {
    /// Create a tracker. `Some(0)` disables tracking; `None` waits for
    /// [`set_total`](Self::set_total).
    pub fn new(config: ProgressConfig, total: Option<u64>, label: impl Into<String>) -> Self {
        Self {
            config: config.normalized(),
            label: label.into(),
            total,
            processed: 0,
            next_threshold: 0,
            started: Instant::now(),
        }
    }

    /// Set the total once it is discovered. Only the first known total counts.
    pub fn set_total(&mut self, total: u64) {
        if self.total.is_none() {
            self.total = Some(total);
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Whether updates can produce events
    pub fn is_active(&self) -> bool {
        matches!(self.total, Some(t) if t > 0)
    }

    /// Record a new cumulative count, emitting an event when the next step is
    /// crossed. Counts lower than the last one are ignored.
    pub fn update(&mut self, processed: u64) -> Option<ProgressEvent> {
        if processed < self.processed {
            return None;
        }
        self.processed = processed;

        let total = match self.total {
            Some(t) if t > 0 => t,
            _ => return None,
        };
        let step = u128::from(self.config.step_percent);
        let scaled = u128::from(processed) * 100;
        let total = u128::from(total);

        if scaled <= u128::from(self.next_threshold) * step * total {
            return None;
        }
        // First step strictly above the current fraction
        self.next_threshold = (scaled / (step * total) + 1) as u64;

        let event = self.event_for(processed, total as u64);
        self.log_event(&event);
        Some(event)
    }

    /// Log a completion summary
    pub fn finish(&self) {
        let elapsed = self.started.elapsed();
        match self.total {
            Some(total) if total > 0 => info!(
                "{}: finished {} of {} in {:.1}s",
                self.label,
                self.processed,
                total,
                elapsed.as_secs_f64()
            ),
            _ => info!(
                "{}: finished {} items in {:.1}s",
                self.label,
                self.processed,
                elapsed.as_secs_f64()
            ),
        }
    }

    fn event_for(&self, processed: u64, total: u64) -> ProgressEvent {
        let elapsed = self.started.elapsed();
        let percent = processed as f64 * 100.0 / total as f64;

        let remaining = (self.config.include_eta && processed > 0).then(|| {
            let estimated_total = elapsed.as_secs_f64() * total as f64 / processed as f64;
            Duration::from_secs_f64((estimated_total - elapsed.as_secs_f64()).max(0.0))
        });

        ProgressEvent {
            processed,
            total,
            percent,
            elapsed,
            remaining,
        }
    }

    fn log_event(&self, event: &ProgressEvent) {
        match event.remaining_display() {
            Some(remaining) => info!(
                "{}: {:.1}s elapsed, {:.0}% complete, about {} remaining",
                self.label,
                event.elapsed.as_secs_f64(),
                event.percent,
                remaining
            ),
            None => info!(
                "{}: {:.1}s elapsed, {:.0}% complete",
                self.label,
                event.elapsed.as_secs_f64(),
                event.percent
            ),
        }
    }
}
