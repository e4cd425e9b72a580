//! Soft throughput ceiling and transfer-rate telemetry
//!
//! [`RateLimiter`] is stateless: after each chunk it sleeps roughly
//! `chunk_len / limit` seconds. It keeps no moving average and grants no
//! burst allowance, so it approximates the ceiling rather than enforcing it
//! like a token bucket would.

use std::time::{Duration, Instant};

/// Minimum interval between two rate reports
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Per-chunk delay calculator for a configured byte rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiter {
    bytes_per_sec: Option<u64>,
}

impl RateLimiter {
    /// Creates a limiter; `None` or `Some(0)` means unlimited
    pub fn new(bytes_per_sec: Option<u64>) -> Self {
        Self {
            bytes_per_sec: bytes_per_sec.filter(|limit| *limit > 0),
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<u64> {
        self.bytes_per_sec
    }

    /// Delay to insert after a chunk of `chunk_len` bytes
    pub fn delay_for(&self, chunk_len: usize) -> Option<Duration> {
        let limit = self.bytes_per_sec?;
        if chunk_len == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(chunk_len as f64 / limit as f64))
    }
}

/// Sliding-window byte counter for live transfer-rate reporting
///
/// Purely observational; nothing in the transfer depends on its output.
#[derive(Debug, Clone)]
pub struct TransferMeter {
    window_start: Instant,
    window_bytes: u64,
    total_bytes: u64,
}

impl TransferMeter {
    /// Starts a meter whose running total begins at `initial_bytes`
    pub fn new(initial_bytes: u64) -> Self {
        Self::starting_at(initial_bytes, Instant::now())
    }

    pub fn starting_at(initial_bytes: u64, now: Instant) -> Self {
        Self {
            window_start: now,
            window_bytes: 0,
            total_bytes: initial_bytes,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn record(&mut self, bytes: usize) -> Option<f64> {
        self.record_at(bytes, Instant::now())
    }

    /// Adds `bytes` to the running total
    ///
    /// Returns the rate in bytes per second observed over the current window
    /// once at least [`REPORT_INTERVAL`] has elapsed, then starts a new window.
    pub fn record_at(&mut self, bytes: usize, now: Instant) -> Option<f64> {
        self.total_bytes += bytes as u64;
        self.window_bytes += bytes as u64;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < REPORT_INTERVAL {
            return None;
        }

        let rate = self.window_bytes as f64 / elapsed.as_secs_f64();
        self.window_start = now;
        self.window_bytes = 0;
        Some(rate)
    }
}

/// Formats a byte rate for log output
pub fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: &[&str] = &["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
