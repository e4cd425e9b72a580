//! Download module for single-file transfers
//!
//! This module contains everything a file transfer needs:
//! - The resumable download state machine
//! - Soft rate limiting and live rate telemetry
//! - The cooperative pause checkpoint
//! - Per-destination locking for concurrent transfers

mod engine;
mod locks;
mod pause;
mod rate_limit;

pub use engine::{reconcile, DownloadSettings, DownloadTarget, Downloader, Reconcile};
pub use locks::{PathGuard, PathLocks};
pub use pause::{wait_while_paused, ManualPauseGate, NeverPause, PauseGate, SharedPauseGate};
pub use rate_limit::{format_rate, RateLimiter, TransferMeter, REPORT_INTERVAL};
