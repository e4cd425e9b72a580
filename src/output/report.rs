//! Structured results of a mirror run
//!
//! The traversal returns a [`CrawlReport`]: an arena of [`PageReport`] nodes
//! linked to their parent by index, each carrying the outcomes of the files
//! dispatched from that page. The caller decides what counts as success.

use crate::crawler::CrawlNode;
use crate::state::{DownloadOutcome, PageStatus};
use std::path::PathBuf;
use url::Url;

/// Result of one file transfer
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub url: String,
    /// Destination path; `None` when the URL yielded no usable file name
    pub path: Option<PathBuf>,
    pub outcome: DownloadOutcome,
    /// Attempts made, counting the first
    pub attempts: u32,
}

impl DownloadReport {
    /// A transfer the run was cancelled before starting
    pub fn cancelled(url: &Url, path: Option<PathBuf>) -> Self {
        Self {
            url: url.to_string(),
            path,
            outcome: DownloadOutcome::Cancelled,
            attempts: 0,
        }
    }
}

/// Result of one listing page visit
#[derive(Debug, Clone)]
pub struct PageReport {
    pub url: String,
    pub folder: PathBuf,
    pub depth: u32,
    /// Index of the page this one was discovered on
    pub parent: Option<usize>,
    pub status: PageStatus,
    pub attempts: u32,
    pub error: Option<String>,
    /// Entries that survived filtering
    pub entries: usize,
    pub downloads: Vec<DownloadReport>,
}

impl PageReport {
    pub fn new(node: &CrawlNode, parent: Option<usize>) -> Self {
        Self {
            url: node.url.to_string(),
            folder: node.local_folder.clone(),
            depth: node.depth,
            parent,
            status: PageStatus::Pending,
            attempts: 0,
            error: None,
            entries: 0,
            downloads: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: PageStatus) -> Self {
        self.status = status;
        self
    }
}

/// Tree of page outcomes for a whole run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pages: Vec<PageReport>,
    cancelled: bool,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page and returns its index
    pub fn add_page(&mut self, page: PageReport) -> usize {
        self.pages.push(page);
        self.pages.len() - 1
    }

    pub fn pages(&self) -> &[PageReport] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&PageReport> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut PageReport> {
        self.pages.get_mut(index)
    }

    /// The page the run started from
    pub fn root(&self) -> Option<&PageReport> {
        self.pages.first()
    }

    /// Pages discovered directly on page `index`, in discovery order
    pub fn children(&self, index: usize) -> impl Iterator<Item = (usize, &PageReport)> {
        self.pages
            .iter()
            .enumerate()
            .filter(move |(_, page)| page.parent == Some(index))
    }

    /// Every file outcome of the run, grouped by page
    pub fn downloads(&self) -> impl Iterator<Item = &DownloadReport> {
        self.pages.iter().flat_map(|page| page.downloads.iter())
    }

    pub fn find_download(&self, url: &str) -> Option<&DownloadReport> {
        self.downloads().find(|d| d.url == url)
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// True when nothing failed and nothing was cancelled
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self
                .pages
                .iter()
                .all(|p| !p.status.is_error() && p.status != PageStatus::Cancelled)
            && self.downloads().all(|d| {
                !d.outcome.is_error() && d.outcome != DownloadOutcome::Cancelled
            })
    }
}
