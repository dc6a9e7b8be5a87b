//! Tests for progress tracking

use super::*;
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_case::test_case;

#[test]
fn test_ten_percent_steps_emit_ten_events() {
    let mut tracker = ProgressTracker::new(ProgressConfig::default(), Some(100), "test");

    let emitted: Vec<u64> = (1..=100)
        .filter_map(|n| tracker.update(n))
        .map(|e| e.processed)
        .collect();

    assert_eq!(emitted, vec![1, 11, 21, 31, 41, 51, 61, 71, 81, 91]);
}

#[test]
fn test_five_percent_steps() {
    let mut tracker = ProgressTracker::new(ProgressConfig::with_step(5), Some(100), "bulk");
    let count = (1..=100).filter_map(|n| tracker.update(n)).count();
    assert_eq!(count, 20);
}

#[test]
fn test_threshold_never_reported_twice() {
    let mut tracker = ProgressTracker::new(ProgressConfig::default(), Some(50), "test");

    assert!(tracker.update(10).is_some());
    assert!(tracker.update(10).is_none());
    // Going backwards is ignored
    assert!(tracker.update(3).is_none());
    assert_eq!(tracker.processed(), 10);
    assert!(tracker.update(11).is_some());
}

#[test]
fn test_large_jump_reports_once() {
    let mut tracker = ProgressTracker::new(ProgressConfig::default(), Some(100), "test");

    let event = tracker.update(55).unwrap();
    assert!((event.percent - 55.0).abs() < f64::EPSILON);
    // Next step is 60%, so 56..=60 stay quiet
    for n in 56..=60 {
        assert!(tracker.update(n).is_none());
    }
    assert!(tracker.update(61).is_some());
}

#[test]
fn test_zero_total_disables_tracking() {
    let mut tracker = ProgressTracker::new(ProgressConfig::default(), Some(0), "empty");
    assert!(!tracker.is_active());
    assert!(tracker.update(0).is_none());
    assert!(tracker.update(5).is_none());
}

#[test]
fn test_unknown_total_until_set() {
    let mut tracker = ProgressTracker::new(ProgressConfig::default(), None, "cursor");
    assert!(tracker.update(10).is_none());

    tracker.set_total(20);
    assert_eq!(tracker.total(), Some(20));
    assert!(tracker.update(10).is_some());

    // A later total does not replace the first one
    tracker.set_total(500);
    assert_eq!(tracker.total(), Some(20));
}

#[test]
fn test_eta_skipped_when_disabled() {
    let config = ProgressConfig::default().eta(false);
    let mut tracker = ProgressTracker::new(config, Some(10), "test");
    let event = tracker.update(1).unwrap();
    assert!(event.remaining.is_none());
}

#[test]
fn test_eta_present_after_progress() {
    let mut tracker = ProgressTracker::new(ProgressConfig::default(), Some(10), "test");
    std::thread::sleep(Duration::from_millis(20));
    let event = tracker.update(5).unwrap();

    let remaining = event.remaining.unwrap();
    // Half done: remaining is roughly the elapsed time
    assert!(remaining <= event.elapsed + Duration::from_millis(5));
    assert!(event.remaining_display().unwrap().ends_with("seconds"));
}

#[test_case(0, 1 ; "zero clamps up")]
#[test_case(5, 5 ; "in range")]
#[test_case(250, 100 ; "clamps down")]
fn test_step_is_clamped(step: u32, expected: u32) {
    assert_eq!(ProgressConfig::with_step(step).step_percent, expected);
}

#[test_case(Duration::from_millis(12_340), "12.3 seconds" ; "seconds")]
#[test_case(Duration::from_secs(59), "59.0 seconds" ; "just under a minute")]
#[test_case(Duration::from_secs(60), "1 minutes" ; "one minute")]
#[test_case(Duration::from_secs(179), "2 minutes" ; "truncated minutes")]
fn test_format_remaining(remaining: Duration, expected: &str) {
    assert_eq!(format_remaining(remaining), expected);
}
