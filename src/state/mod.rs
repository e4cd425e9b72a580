//! State module for tracking mirror progress
//!
//! # Components
//!
//! - `PageStatus`: Terminal state of each listing page (success, failed, depth exceeded, ...)
//! - `DownloadOutcome`: Terminal state of each file transfer (completed, skipped, failed, cancelled)

mod download_state;
mod page_state;

// Re-export main types
pub use download_state::{DownloadOutcome, SkipReason};
pub use page_state::PageStatus;
