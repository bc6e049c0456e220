//! Clock and timing utilities.
//!
//! A capture run is anchored to a monotonic epoch recorded when it starts.
//! This module provides:
//! - The run clock used for progress and ETA reporting
//! - Strictly increasing wall-clock timestamps for output file names

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Last timestamp handed out by [`output_timestamp_ms`].
static LAST_OUTPUT_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

/// A run clock that provides monotonic timings relative to a fixed epoch
/// (the moment the run started).
#[derive(Debug, Clone)]
pub struct RunClock {
    /// The instant the run started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl RunClock {
    /// Create a new run clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get seconds elapsed since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at run start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Average frames per second and estimated seconds remaining.
    pub fn rate(&self, done: u64, total: u64) -> FrameRate {
        FrameRate::measure(done, total, self.elapsed_secs())
    }
}

/// Throughput snapshot of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    /// Frames completed per wall-clock second.
    pub frames_per_sec: f64,

    /// Estimated seconds until all frames are done.
    pub eta_secs: f64,
}

impl FrameRate {
    pub fn measure(done: u64, total: u64, elapsed_secs: f64) -> Self {
        if done == 0 || elapsed_secs <= 0.0 {
            return Self {
                frames_per_sec: 0.0,
                eta_secs: 0.0,
            };
        }
        let frames_per_sec = done as f64 / elapsed_secs;
        let remaining = total.saturating_sub(done) as f64;
        Self {
            frames_per_sec,
            eta_secs: remaining / frames_per_sec,
        }
    }
}

/// Milliseconds since the Unix epoch, strictly increasing across calls.
///
/// Two output files created within the same millisecond would otherwise
/// collide, so a repeated value is bumped past the previous one.
pub fn output_timestamp_ms() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_OUTPUT_TIMESTAMP_MS.load(Ordering::SeqCst);
    loop {
        let next = now.max(last + 1);
        match LAST_OUTPUT_TIMESTAMP_MS.compare_exchange(
            last,
            next,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
