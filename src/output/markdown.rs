//! Markdown summary generation
//!
//! This module renders a mirror run as a human-readable markdown report:
//! statistics, the visited listing tree, and every failed transfer.

use crate::output::{CrawlReport, MirrorStatistics};
use crate::state::{DownloadOutcome, PageStatus};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of `report` to `output_path`
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a mirror report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let stats = MirrorStatistics::from_report(report);
    let mut md = String::new();

    md.push_str("# Sumi-Mirror Run Summary\n\n");

    if let Some(root) = report.root() {
        md.push_str(&format!("- **Root**: {}\n", root.url));
        md.push_str(&format!("- **Destination**: {}\n", root.folder.display()));
    }
    if report.is_cancelled() {
        md.push_str("- **Status**: cancelled\n");
    } else if report.is_success() {
        md.push_str("- **Status**: complete\n");
    } else {
        md.push_str("- **Status**: finished with failures\n");
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Listing Pages**: {}\n", stats.total_pages));
    md.push_str(&format!("- **Files Dispatched**: {}\n", stats.total_files));
    md.push_str(&format!("- **Bytes Downloaded**: {}\n", stats.bytes_downloaded));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.file_success_rate()
    ));

    md.push_str("## File Outcomes\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Completed | {} |\n", stats.files_completed));
    md.push_str(&format!("| Resumed | {} |\n", stats.files_resumed));
    md.push_str(&format!("| Skipped | {} |\n", stats.files_skipped));
    md.push_str(&format!("| Failed | {} |\n", stats.files_failed));
    md.push_str(&format!("| Cancelled | {} |\n\n", stats.files_cancelled));

    if !report.pages().is_empty() {
        md.push_str("## Listing Tree\n\n");
        for page in report.pages() {
            let indent = "  ".repeat(page.depth as usize);
            md.push_str(&format!(
                "{}- {} ({}, {} files)\n",
                indent,
                page.url,
                page.status,
                page.downloads.len()
            ));
        }
        md.push('\n');
    }

    let failed_pages: Vec<_> = report
        .pages()
        .iter()
        .filter(|p| p.status == PageStatus::Failed)
        .collect();
    if !failed_pages.is_empty() {
        md.push_str("## Failed Pages\n\n");
        md.push_str("| URL | Attempts | Cause |\n");
        md.push_str("|-----|----------|-------|\n");
        for page in failed_pages {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.url,
                page.attempts,
                escape_cell(page.error.as_deref().unwrap_or(""))
            ));
        }
        md.push('\n');
    }

    let failed_files: Vec<_> = report
        .downloads()
        .filter_map(|d| match &d.outcome {
            DownloadOutcome::Failed { cause } => Some((d, cause)),
            _ => None,
        })
        .collect();
    if !failed_files.is_empty() {
        md.push_str("## Failed Files\n\n");
        md.push_str("| URL | Path | Attempts | Cause |\n");
        md.push_str("|-----|------|----------|-------|\n");
        for (download, cause) in failed_files {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                download.url,
                download
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                download.attempts,
                escape_cell(cause)
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
