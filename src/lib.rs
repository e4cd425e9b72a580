//! Sumi-Mirror: a resumable directory-listing mirror
//!
//! This crate walks server-rendered directory listings (HTML pages of folder
//! and file links) and mirrors them onto local storage, with bounded retries,
//! resumable range downloads, soft rate limiting and cooperative pause/resume.

pub mod config;
pub mod crawler;
pub mod download;
pub mod output;
pub mod retry;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sumi-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    /// The root listing never answered; nothing could be mirrored
    #[error("Root listing {url} unreachable: {cause}")]
    RootUnreachable { url: String, cause: String },

    #[error("Mirror run cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure of a single page fetch or file transfer
///
/// The variants follow the retry taxonomy: network trouble and server-side
/// statuses may be retried, local filesystem problems and failed size probes
/// may not.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {source}")]
    TransientNetwork {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No bytes arrived within the read timeout
    #[error("No data from {url} for {idle:?}")]
    Stalled { url: String, idle: std::time::Duration },

    #[error("Server unavailable (HTTP 503) for {url}")]
    ServerUnavailable { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Size probe failed for {url}: HTTP {status}")]
    ProbeFailed { url: String, status: u16 },

    #[error("Server resumed {url} at byte {actual}, expected {expected}")]
    RangeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("Transfer of {url} stopped at {received} of {expected} bytes")]
    IncompleteTransfer {
        url: String,
        received: u64,
        expected: u64,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    LocalFilesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn network(url: &::url::Url, source: reqwest::Error) -> Self {
        Self::TransientNetwork {
            url: url.to_string(),
            source,
        }
    }

    /// Maps a non-success HTTP status onto the error taxonomy
    pub fn from_status(url: &::url::Url, status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            Self::ServerUnavailable {
                url: url.to_string(),
            }
        } else {
            Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalFilesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether a file transfer should be attempted again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. }
                | Self::Stalled { .. }
                | Self::ServerUnavailable { .. }
                | Self::HttpStatus { .. }
                | Self::RangeMismatch { .. }
                | Self::IncompleteTransfer { .. }
        )
    }

    /// Whether a listing page fetch should be attempted again after this error
    ///
    /// Listing pages only retry on network trouble and 503; any other status
    /// ends the branch on the first answer.
    pub fn is_page_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. } | Self::Stalled { .. } | Self::ServerUnavailable { .. }
        )
    }
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Crawler;
pub use download::{Downloader, ManualPauseGate, PauseGate};
pub use output::{CrawlReport, DownloadReport, PageReport};
pub use retry::RetryPolicy;
pub use state::{DownloadOutcome, PageStatus, SkipReason};
