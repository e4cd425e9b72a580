//! Cooperative pause/resume checkpoint
//!
//! The downloader consults a [`PauseGate`] after every chunk. The gate is an
//! injected capability: the binary backs it with stdin commands, tests back it
//! with scripted fakes. One gate is shared by every transfer in a run, so a
//! pause request holds all concurrent downloads at their next chunk boundary.

use crate::FetchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Polling predicates backed by an external signal source
pub trait PauseGate: Send + Sync {
    fn is_pause_requested(&self) -> bool;

    fn is_resume_requested(&self) -> bool;
}

/// Shared handle to a pause gate
pub type SharedPauseGate = Arc<dyn PauseGate>;

/// Gate that never pauses
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPause;

impl PauseGate for NeverPause {
    fn is_pause_requested(&self) -> bool {
        false
    }

    fn is_resume_requested(&self) -> bool {
        true
    }
}

/// Gate toggled programmatically
#[derive(Debug, Default)]
pub struct ManualPauseGate {
    paused: AtomicBool,
}

impl ManualPauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl PauseGate for ManualPauseGate {
    fn is_pause_requested(&self) -> bool {
        self.is_paused()
    }

    fn is_resume_requested(&self) -> bool {
        !self.is_paused()
    }
}

/// Blocks while the gate asks for a pause
///
/// Returns `Ok(true)` if the caller was held, `Ok(false)` if no pause was
/// requested, and `Err(FetchError::Cancelled)` if cancellation arrived while
/// paused. Nothing is released or re-requested, so the caller continues from
/// the exact byte it stopped at.
pub async fn wait_while_paused(
    gate: &dyn PauseGate,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Result<bool, FetchError> {
    if !gate.is_pause_requested() {
        return Ok(false);
    }

    tracing::info!("Transfer paused, waiting for resume");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(poll_interval) => {}
        }

        if gate.is_resume_requested() {
            tracing::info!("Transfer resumed");
            return Ok(true);
        }
    }
}
