//! Progress reporting for long-running fetches
//!
//! A [`ProgressTracker`] watches a processed count grow toward a total and
//! logs an event each time the count crosses the next step (10% by default).
//! The total may be unknown at construction; cursor providers usually report
//! it only with the first page.

mod tracker;

pub use tracker::{format_remaining, ProgressConfig, ProgressEvent, ProgressTracker};

#[cfg(test)]
mod tests;
