//! Scan progress and time-remaining estimation
//!
//! The scanner publishes [`ProgressEvent`]s through a [`ProgressObserver`];
//! a UI subscribes by passing a channel sender or a closure and is never
//! called back for anything else.

use serde::Serialize;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

/// Linear extrapolation of the time still needed
///
/// Returns `None` until at least one item has been processed.
pub fn estimate_remaining(elapsed: Duration, processed: usize, total: usize) -> Option<Duration> {
    if processed == 0 {
        return None;
    }
    let elapsed_secs = elapsed.as_secs_f64();
    let estimated_total = elapsed_secs / processed as f64 * total as f64;
    Some(Duration::from_secs_f64((estimated_total - elapsed_secs).max(0.0)))
}

/// Elapsed and remaining time at one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
}

/// Wall-clock stopwatch with ETA extrapolation
#[derive(Debug, Default)]
pub struct ProgressReporter {
    started: Option<Instant>,
    frozen: Option<Duration>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the clock
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.frozen = None;
    }

    /// Time since `start()`, frozen once `stop()` was called
    pub fn elapsed(&self) -> Duration {
        match (self.frozen, self.started) {
            (Some(frozen), _) => frozen,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// Record progress and compute the current estimate
    pub fn tick(&self, processed: usize, total: usize) -> Tick {
        let elapsed = self.elapsed();
        Tick {
            elapsed,
            remaining: estimate_remaining(elapsed, processed, total),
        }
    }

    /// Freeze the elapsed time
    pub fn stop(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed());
        }
    }
}

/// One progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
}

impl ProgressEvent {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

/// Receiver of progress notifications
pub trait ProgressObserver {
    fn on_progress(&mut self, event: ProgressEvent);
}

/// Observer that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _event: ProgressEvent) {}
}

impl ProgressObserver for Sender<ProgressEvent> {
    fn on_progress(&mut self, event: ProgressEvent) {
        // A subscriber that hung up must not stop the scan
        let _ = self.send(event);
    }
}

impl<F> ProgressObserver for F
where
    F: FnMut(ProgressEvent),
{
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Format a duration as `hh:mm:ss`
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
