//! Crawler coordinator - main mirror orchestration logic
//!
//! This module contains the traversal loop that coordinates:
//! - Creating local folders for listing pages
//! - Fetching and parsing listings with retry
//! - Enforcing the depth bound
//! - Dispatching file entries to the downloader
//! - Recording every outcome in the report tree

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_listing_with_retry};
use crate::crawler::parser::parse_listing;
use crate::crawler::scheduler::{CrawlNode, Frontier, WorkItem};
use crate::download::{DownloadSettings, DownloadTarget, Downloader, SharedPauseGate};
use crate::output::{CrawlReport, DownloadReport, PageReport};
use crate::retry::RetryPolicy;
use crate::state::{DownloadOutcome, PageStatus};
use crate::{FetchError, MirrorError};
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Traversal tunables
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Deepest listing level visited; the root is level 0
    pub max_depth: u32,

    pub page_retry: RetryPolicy,

    pub page_timeout: Duration,

    /// Files of one page transferred at the same time
    pub max_concurrent_downloads: usize,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.mirror.max_depth,
            page_retry: RetryPolicy::for_pages(&config.retry),
            page_timeout: config.http.page_timeout(),
            max_concurrent_downloads: config.transfer.max_concurrent_downloads,
        }
    }
}

/// Depth-first mirror of a directory listing tree
pub struct Crawler {
    client: Client,
    settings: CrawlSettings,
    downloader: Downloader,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(
        client: Client,
        settings: CrawlSettings,
        downloader: Downloader,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            downloader,
            cancel,
        }
    }

    /// Builds a crawler and its downloader from configuration
    ///
    /// One HTTP client is shared by listing fetches and file transfers.
    pub fn from_config(
        config: &Config,
        pause: SharedPauseGate,
        cancel: CancellationToken,
    ) -> Result<Self, MirrorError> {
        let client = build_http_client(config)?;
        let downloader = Downloader::new(
            client.clone(),
            DownloadSettings::from_config(config),
            pause,
            cancel.clone(),
        );

        Ok(Self::new(
            client,
            CrawlSettings::from_config(config),
            downloader,
            cancel,
        ))
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Mirrors the listing tree under `root` into `destination`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Traversal finished; individual pages and files
    ///   may still have failed
    /// * `Err(MirrorError::RootUnreachable)` - The root listing itself could
    ///   not be fetched
    /// * `Err(MirrorError::Cancelled)` - Cancelled before the root was fetched
    pub async fn run(&self, root: &Url, destination: &Path) -> Result<CrawlReport, MirrorError> {
        tracing::info!(
            "Mirroring {} into {} (max depth {})",
            root,
            destination.display(),
            self.settings.max_depth
        );

        let report = self.traverse(root, destination, 0).await;

        if let Some(root_page) = report.root() {
            match root_page.status {
                PageStatus::Failed => {
                    return Err(MirrorError::RootUnreachable {
                        url: root_page.url.clone(),
                        cause: root_page.error.clone().unwrap_or_default(),
                    })
                }
                PageStatus::Cancelled => return Err(MirrorError::Cancelled),
                _ => {}
            }
        }

        Ok(report)
    }

    /// Visits `url` as a listing page at `current_depth`, mirroring into `folder`
    ///
    /// Never fails: every page and file outcome lands in the returned report.
    /// A depth beyond the configured bound yields an empty report.
    ///
    /// Subdirectories listed one level past the bound are recorded as
    /// `DepthExceeded` and get no local folder: only visited pages create
    /// one, so a depth-limited run leaves no empty directories behind.
    /// Entries still pending when the run is cancelled are recorded as
    /// `Cancelled`.
    pub async fn traverse(&self, url: &Url, folder: &Path, current_depth: u32) -> CrawlReport {
        let mut report = CrawlReport::new();
        if current_depth > self.settings.max_depth {
            tracing::debug!(
                "Not visiting {}: depth {} exceeds {}",
                url,
                current_depth,
                self.settings.max_depth
            );
            return report;
        }

        let mut frontier = Frontier::seeded(CrawlNode {
            url: url.clone(),
            local_folder: folder.to_path_buf(),
            depth: current_depth,
        });

        while let Some(item) = frontier.pop() {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    "Mirror cancelled; {} pending entries left unvisited",
                    frontier.len() + 1
                );
                record_cancelled(item, &mut report);
                for pending in frontier.drain() {
                    record_cancelled(pending, &mut report);
                }
                report.mark_cancelled();
                break;
            }

            match item {
                WorkItem::Page { node, parent } => {
                    let index = report.add_page(PageReport::new(&node, parent));
                    self.visit(&node, index, &mut report, &mut frontier).await;
                }
                WorkItem::File { url, folder, page } => {
                    let mut batch = vec![(url, folder)];
                    let limit = self.settings.max_concurrent_downloads.max(1);
                    batch.extend(frontier.pop_file_batch(page, limit - 1));
                    self.download_batch(batch, page, &mut report).await;
                }
            }
        }

        if self.cancel.is_cancelled() {
            report.mark_cancelled();
        }

        report
    }

    /// Fetches one listing page and schedules its entries
    async fn visit(
        &self,
        node: &CrawlNode,
        index: usize,
        report: &mut CrawlReport,
        frontier: &mut Frontier,
    ) {
        if let Err(e) = tokio::fs::create_dir_all(&node.local_folder).await {
            let error = FetchError::filesystem(&node.local_folder, e);
            tracing::error!("{} -> {}: {}", node.url, node.local_folder.display(), error);
            if let Some(page) = report.page_mut(index) {
                page.status = PageStatus::Failed;
                page.error = Some(error.to_string());
            }
            return;
        }

        tracing::info!("Visiting {} (depth {})", node.url, node.depth);

        let result = fetch_listing_with_retry(
            &self.client,
            &node.url,
            &self.settings.page_retry,
            self.settings.page_timeout,
            &self.cancel,
        )
        .await;

        let (listing, attempts) = match result {
            Ok(fetched) => fetched,
            Err((FetchError::Cancelled, attempts)) => {
                if let Some(page) = report.page_mut(index) {
                    page.status = PageStatus::Cancelled;
                    page.attempts = attempts;
                }
                return;
            }
            Err((e, attempts)) => {
                tracing::error!(
                    "{} -> {}: listing failed after {} attempts: {}",
                    node.url,
                    node.local_folder.display(),
                    attempts,
                    e
                );
                if let Some(page) = report.page_mut(index) {
                    page.status = PageStatus::Failed;
                    page.attempts = attempts;
                    page.error = Some(e.to_string());
                }
                return;
            }
        };

        let entries = parse_listing(&listing.body, &listing.final_url);
        tracing::debug!("{} lists {} entries", node.url, entries.len());

        let mut children = Vec::with_capacity(entries.len());
        for entry in &entries {
            if !entry.is_directory {
                children.push(WorkItem::File {
                    url: entry.resolved_url.clone(),
                    folder: node.local_folder.clone(),
                    page: index,
                });
                continue;
            }

            let Some(name) = entry.dir_name() else {
                tracing::debug!("Skipping directory {:?}: no usable name", entry.href_raw);
                continue;
            };

            let child = CrawlNode {
                url: entry.resolved_url.clone(),
                local_folder: node.local_folder.join(name),
                depth: node.depth + 1,
            };

            if child.depth > self.settings.max_depth {
                tracing::debug!(
                    "Not descending into {}: depth {} exceeds {}",
                    child.url,
                    child.depth,
                    self.settings.max_depth
                );
                report.add_page(
                    PageReport::new(&child, Some(index)).with_status(PageStatus::DepthExceeded),
                );
            } else {
                children.push(WorkItem::Page {
                    node: child,
                    parent: Some(index),
                });
            }
        }

        if let Some(page) = report.page_mut(index) {
            page.status = PageStatus::Success;
            page.attempts = attempts;
            page.entries = entries.len();
        }

        frontier.push_children(children);
    }

    /// Transfers a batch of files from one page, keeping report order
    async fn download_batch(
        &self,
        batch: Vec<(Url, PathBuf)>,
        page: usize,
        report: &mut CrawlReport,
    ) {
        let concurrency = batch.len();
        let downloader = &self.downloader;

        let results: Vec<_> = stream::iter(batch)
            .map(|(url, folder)| async move { downloader.fetch(&url, &folder).await })
            .buffered(concurrency)
            .collect()
            .await;

        if results
            .iter()
            .any(|r| r.outcome == DownloadOutcome::Cancelled)
        {
            tracing::debug!("Transfer batch interrupted by cancellation");
        }

        if let Some(page) = report.page_mut(page) {
            page.downloads.extend(results);
        }
    }
}

/// Records a work item the run was cancelled before reaching
fn record_cancelled(item: WorkItem, report: &mut CrawlReport) {
    match item {
        WorkItem::Page { node, parent } => {
            report.add_page(PageReport::new(&node, parent).with_status(PageStatus::Cancelled));
        }
        WorkItem::File { url, folder, page } => {
            let path = DownloadTarget::new(&url, &folder).map(|target| target.path());
            if let Some(page) = report.page_mut(page) {
                page.downloads.push(DownloadReport::cancelled(&url, path));
            }
        }
    }
}
