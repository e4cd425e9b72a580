//! Crawler module for listing traversal
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching of listing pages with retry logic
//! - Listing parsing and link extraction
//! - The depth-first worklist
//! - Overall traversal coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{CrawlSettings, Crawler};
pub use fetcher::{build_http_client, fetch_listing, fetch_listing_with_retry, ListingPage};
pub use parser::parse_listing;
pub use scheduler::{CrawlNode, Frontier, WorkItem};

use crate::config::Config;
use crate::download::SharedPauseGate;
use crate::output::CrawlReport;
use crate::MirrorError;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Runs a complete mirror operation
///
/// This is the main entry point for a mirror run. It will:
/// 1. Build the HTTP client, crawler and downloader
/// 2. Traverse the listing tree from the configured root
/// 3. Download every file entry into the matching local folder
///
/// # Arguments
///
/// * `config` - The validated mirror configuration
/// * `pause` - Gate consulted between transfer chunks
/// * `cancel` - Token that stops the run at the next checkpoint
pub async fn mirror(
    config: &Config,
    pause: SharedPauseGate,
    cancel: CancellationToken,
) -> Result<CrawlReport, MirrorError> {
    let root = Url::parse(&config.mirror.root_url)?;
    let crawler = Crawler::from_config(config, pause, cancel)?;
    crawler
        .run(&root, Path::new(&config.mirror.destination))
        .await
}
