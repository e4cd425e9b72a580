//! Output module for mirror results
//!
//! This module handles:
//! - The structured per-page/per-file result tree
//! - Aggregated statistics for display
//! - Markdown summaries of a run

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{CrawlReport, DownloadReport, PageReport};
pub use stats::{print_statistics, MirrorStatistics};

impl CrawlReport {
    /// Aggregates this report into display statistics
    pub fn statistics(&self) -> MirrorStatistics {
        MirrorStatistics::from_report(self)
    }
}
