//! Statistics generation from a mirror run
//!
//! This module aggregates a [`CrawlReport`] into counts for display.

use crate::output::CrawlReport;
use crate::state::{DownloadOutcome, PageStatus};
use std::collections::HashMap;

/// Mirror statistics summary
#[derive(Debug, Clone, Default)]
pub struct MirrorStatistics {
    /// Total number of listing pages recorded (visited or bounded)
    pub total_pages: u64,

    /// Count of pages by status
    pub pages_by_status: HashMap<PageStatus, u64>,

    /// Total number of files dispatched
    pub total_files: u64,

    pub files_completed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub files_cancelled: u64,

    /// Bytes written to disk during this run
    pub bytes_downloaded: u64,

    /// Completed transfers that appended to a partial file
    pub files_resumed: u64,

    /// Deepest level visited
    pub max_depth_reached: u32,
}

impl MirrorStatistics {
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut stats = Self::default();

        for page in report.pages() {
            stats.total_pages += 1;
            *stats.pages_by_status.entry(page.status).or_insert(0) += 1;
            if page.status.is_success() {
                stats.max_depth_reached = stats.max_depth_reached.max(page.depth);
            }
        }

        for download in report.downloads() {
            stats.total_files += 1;
            stats.bytes_downloaded += download.outcome.bytes_written();
            match &download.outcome {
                DownloadOutcome::Completed { resumed_from, .. } => {
                    stats.files_completed += 1;
                    if resumed_from.is_some() {
                        stats.files_resumed += 1;
                    }
                }
                DownloadOutcome::Skipped(_) => stats.files_skipped += 1,
                DownloadOutcome::Failed { .. } => stats.files_failed += 1,
                DownloadOutcome::Cancelled => stats.files_cancelled += 1,
            }
        }

        stats
    }

    pub fn pages_with(&self, status: PageStatus) -> u64 {
        self.pages_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of dispatched files that ended Completed or Skipped, in percent
    pub fn file_success_rate(&self) -> f64 {
        if self.total_files == 0 {
            return 100.0;
        }
        (self.files_completed + self.files_skipped) as f64 / self.total_files as f64 * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Pages:");
    println!("  Total listing pages: {}", stats.total_pages);
    let mut status_counts: Vec<_> = stats.pages_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));
    for (status, count) in status_counts {
        println!("  {}: {}", status, count);
    }
    println!("  Deepest level reached: {}", stats.max_depth_reached);
    println!();

    println!("Files:");
    println!("  Dispatched: {}", stats.total_files);
    println!(
        "  Completed: {} ({} resumed)",
        stats.files_completed, stats.files_resumed
    );
    println!("  Skipped: {}", stats.files_skipped);
    println!("  Failed: {}", stats.files_failed);
    if stats.files_cancelled > 0 {
        println!("  Cancelled: {}", stats.files_cancelled);
    }
    println!("  Bytes downloaded: {}", stats.bytes_downloaded);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} files completed or already present)",
        stats.file_success_rate(),
        stats.files_completed + stats.files_skipped,
        stats.total_files
    );
}
