//! Resumable, rate-limited, pausable single-file transfer
//!
//! # State Machine
//!
//! ```text
//! ProbeSize ──non-2xx──────────────────────────────▶ Failed
//!     │
//! Reconcile ──local == remote──────────────────────▶ Skipped
//!     │ (Completed if an earlier attempt of this run wrote the bytes)
//!     │ local < remote: Resume(offset = local)
//!     │ local > remote, no local file, unknown size: FreshStart
//! Stream ──exhausted───────────────────────────────▶ Completed
//!     │ network / status / short body / read timeout
//! Retrying ──attempts left: back to ProbeSize
//!          ──exhausted─────────────────────────────▶ Failed
//! ```
//!
//! Cancellation is honored at every chunk boundary, while paused and during
//! retry sleeps, and ends the transfer as `Cancelled`.

use crate::config::Config;
use crate::download::locks::PathLocks;
use crate::download::pause::{wait_while_paused, SharedPauseGate};
use crate::download::rate_limit::{format_rate, RateLimiter, TransferMeter};
use crate::output::DownloadReport;
use crate::retry::{sleep_or_cancel, RetryPolicy};
use crate::state::{DownloadOutcome, SkipReason};
use crate::url::sanitize_file_name;
use crate::FetchError;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, Response, StatusCode};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Tunables for the download engine
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Largest slice written, metered and throttled at once
    pub chunk_size: usize,

    /// Default soft ceiling in bytes per second
    pub speed_limit: Option<u64>,

    pub retry: RetryPolicy,

    pub pause_poll_interval: Duration,

    /// Timeout for the size probe
    pub probe_timeout: Duration,

    /// Longest wait for response headers or the next body chunk
    pub read_timeout: Duration,
}

impl DownloadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.transfer.chunk_size,
            speed_limit: config.transfer.effective_speed_limit(),
            retry: RetryPolicy::for_files(&config.retry),
            pause_poll_interval: config.transfer.pause_poll_interval(),
            probe_timeout: config.http.page_timeout(),
            read_timeout: config.http.read_timeout(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            speed_limit: None,
            retry: RetryPolicy::new(5, 2.0, 0.0),
            pause_poll_interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// How the local copy relates to the remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Local copy already has the remote size
    Skip,

    /// Local copy is a prefix; request the tail from `offset`
    Resume { offset: u64 },

    /// Write the whole resource from byte 0
    FreshStart,
}

/// Decides what to do with an existing local copy
///
/// An unknown remote size can neither confirm completeness nor bound a
/// resume, so it always restarts from scratch.
pub fn reconcile(local_size: Option<u64>, remote_size: Option<u64>) -> Reconcile {
    match (local_size, remote_size) {
        (Some(local), Some(remote)) if local == remote => Reconcile::Skip,
        (Some(local), Some(remote)) if local > 0 && local < remote => {
            Reconcile::Resume { offset: local }
        }
        _ => Reconcile::FreshStart,
    }
}

/// One file transfer
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub url: Url,
    pub dest_folder: PathBuf,
    /// Sanitized; never empty, `.` or `..`
    pub file_name: String,
    pub local_size: Option<u64>,
    pub remote_size: Option<u64>,
    pub resume_offset: u64,
    /// Offset where this run first wrote; `None` until a body is opened
    pub written_from: Option<u64>,
}

impl DownloadTarget {
    /// Builds a target, or `None` when the URL yields no usable file name
    pub fn new(url: &Url, dest_folder: &Path) -> Option<Self> {
        let file_name = sanitize_file_name(url);
        if file_name.is_empty() {
            return None;
        }

        Some(Self {
            url: url.clone(),
            dest_folder: dest_folder.to_path_buf(),
            file_name,
            local_size: None,
            remote_size: None,
            resume_offset: 0,
            written_from: None,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dest_folder.join(&self.file_name)
    }

    /// Completion outcome for a local copy that now ends at byte `end`
    ///
    /// Counts every byte this run wrote, across all attempts.
    pub fn completed(&self, end: u64) -> DownloadOutcome {
        let start = self.written_from.unwrap_or(end);
        DownloadOutcome::Completed {
            bytes_written: end.saturating_sub(start),
            resumed_from: (start > 0).then_some(start),
        }
    }
}

/// Fetches single resources into local folders
pub struct Downloader {
    client: Client,
    settings: DownloadSettings,
    pause: SharedPauseGate,
    locks: PathLocks,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(
        client: Client,
        settings: DownloadSettings,
        pause: SharedPauseGate,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            pause,
            locks: PathLocks::new(),
            cancel,
        }
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Downloads `url` into `folder` with the configured speed limit
    pub async fn fetch(&self, url: &Url, folder: &Path) -> DownloadReport {
        self.fetch_with_limit(url, folder, self.settings.speed_limit)
            .await
    }

    /// Downloads `url` into `folder`, throttled to `speed_limit` bytes per second
    ///
    /// Never returns an error: every failure is folded into the report's
    /// terminal outcome.
    pub async fn fetch_with_limit(
        &self,
        url: &Url,
        folder: &Path,
        speed_limit: Option<u64>,
    ) -> DownloadReport {
        let Some(mut target) = DownloadTarget::new(url, folder) else {
            tracing::debug!("Skipping {}: no usable file name", url);
            return DownloadReport {
                url: url.to_string(),
                path: None,
                outcome: DownloadOutcome::Skipped(SkipReason::InvalidName),
                attempts: 0,
            };
        };

        let path = target.path();
        let _claim = self.locks.acquire(&path).await;
        let limiter = RateLimiter::new(speed_limit);

        let mut retry = self.settings.retry.state();
        let mut attempts = 0;
        let outcome = loop {
            if self.cancel.is_cancelled() {
                break DownloadOutcome::Cancelled;
            }
            attempts += 1;

            match self.attempt(&mut target, &limiter).await {
                Ok(outcome) => break outcome,
                Err(FetchError::Cancelled) => break DownloadOutcome::Cancelled,
                Err(e) if e.is_retryable() => match retry.record_failure() {
                    Some(delay) => {
                        tracing::warn!(
                            "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                            attempts,
                            retry.max_attempts(),
                            url,
                            e,
                            delay
                        );
                        if !sleep_or_cancel(delay, &self.cancel).await {
                            break DownloadOutcome::Cancelled;
                        }
                    }
                    None => {
                        break DownloadOutcome::Failed {
                            cause: format!("{} (after {} attempts)", e, attempts),
                        }
                    }
                },
                Err(e) => break DownloadOutcome::Failed {
                    cause: e.to_string(),
                },
            }
        };

        log_outcome(url, &path, &outcome);

        DownloadReport {
            url: url.to_string(),
            path: Some(path),
            outcome,
            attempts,
        }
    }

    /// One pass through ProbeSize, Reconcile and Stream
    async fn attempt(
        &self,
        target: &mut DownloadTarget,
        limiter: &RateLimiter,
    ) -> Result<DownloadOutcome, FetchError> {
        let path = target.path();

        target.remote_size = self.probe_size(&target.url).await?;
        target.local_size = local_size(&path).await?;

        match reconcile(target.local_size, target.remote_size) {
            Reconcile::Skip => {
                // Bytes from a failed earlier attempt finished the file
                return Ok(match target.written_from {
                    Some(_) => target.completed(target.local_size.unwrap_or_default()),
                    None => DownloadOutcome::Skipped(SkipReason::AlreadyComplete),
                });
            }
            Reconcile::Resume { offset } => target.resume_offset = offset,
            Reconcile::FreshStart => target.resume_offset = 0,
        }

        let response = self.request_body(&target.url, target.resume_offset).await?;
        let append = self.check_body_status(target, &response)?;
        if !append || target.written_from.is_none() {
            target.written_from = Some(target.resume_offset);
        }

        let mut file = open_destination(&path, append).await?;
        let streamed = self.stream_body(&mut file, response, target, limiter).await;

        // Flush even on failure: the next probe must see every written byte
        let flushed = file
            .flush()
            .await
            .map_err(|e| FetchError::filesystem(&path, e));
        let written = streamed?;
        flushed?;

        let received = target.resume_offset + written;
        if let Some(expected) = target.remote_size {
            if received < expected {
                return Err(FetchError::IncompleteTransfer {
                    url: target.url.to_string(),
                    received,
                    expected,
                });
            }
        }

        Ok(target.completed(received))
    }

    /// Metadata-only request for the remote size
    async fn probe_size(&self, url: &Url) -> Result<Option<u64>, FetchError> {
        let response = self
            .client
            .head(url.clone())
            .header(ACCEPT_ENCODING, "identity")
            .timeout(self.settings.probe_timeout)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ProbeFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok()))
    }

    async fn request_body(&self, url: &Url, offset: u64) -> Result<Response, FetchError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT_ENCODING, "identity");
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }

        match tokio::time::timeout(self.settings.read_timeout, request.send()).await {
            Ok(sent) => sent.map_err(|e| FetchError::network(url, e)),
            Err(_) => Err(self.stalled(url)),
        }
    }

    fn stalled(&self, url: &Url) -> FetchError {
        FetchError::Stalled {
            url: url.to_string(),
            idle: self.settings.read_timeout,
        }
    }

    /// Validates the body status; returns whether to append
    ///
    /// A plain 200 in answer to a range request means the server ignored the
    /// range: the body starts at byte 0, so the target falls back to a fresh
    /// start instead of appending a second copy.
    fn check_body_status(
        &self,
        target: &mut DownloadTarget,
        response: &Response,
    ) -> Result<bool, FetchError> {
        let status = response.status();
        let resuming = target.resume_offset > 0;

        match status {
            StatusCode::PARTIAL_CONTENT if resuming => {
                if let Some(start) = content_range_start(response) {
                    if start != target.resume_offset {
                        return Err(FetchError::RangeMismatch {
                            url: target.url.to_string(),
                            expected: target.resume_offset,
                            actual: start,
                        });
                    }
                }
                Ok(true)
            }
            StatusCode::OK => {
                if resuming {
                    tracing::warn!(
                        "Server ignored range request for {}; restarting from byte 0",
                        target.url
                    );
                    target.resume_offset = 0;
                }
                Ok(false)
            }
            other => Err(FetchError::from_status(&target.url, other)),
        }
    }

    /// Copies the body to `file` chunk by chunk; returns bytes written
    async fn stream_body(
        &self,
        file: &mut File,
        response: Response,
        target: &DownloadTarget,
        limiter: &RateLimiter,
    ) -> Result<u64, FetchError> {
        let path = target.path();
        let mut stream = response.bytes_stream();
        let mut meter = TransferMeter::new(target.resume_offset);
        let mut written: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                next = tokio::time::timeout(self.settings.read_timeout, stream.next()) => next,
            };
            let Ok(next) = next else {
                return Err(self.stalled(&target.url));
            };
            let Some(piece) = next else { break };
            let piece = piece.map_err(|e| FetchError::network(&target.url, e))?;

            for chunk in piece.chunks(self.settings.chunk_size.max(1)) {
                file.write_all(chunk)
                    .await
                    .map_err(|e| FetchError::filesystem(&path, e))?;
                written += chunk.len() as u64;

                if let Some(rate) = meter.record(chunk.len()) {
                    tracing::debug!(
                        "{}: {} of {} bytes at {}",
                        target.file_name,
                        meter.total_bytes(),
                        target
                            .remote_size
                            .map_or_else(|| "?".to_string(), |size| size.to_string()),
                        format_rate(rate)
                    );
                }

                if let Some(delay) = limiter.delay_for(chunk.len()) {
                    if !sleep_or_cancel(delay, &self.cancel).await {
                        return Err(FetchError::Cancelled);
                    }
                }

                if self.cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }

                if wait_while_paused(
                    self.pause.as_ref(),
                    self.settings.pause_poll_interval,
                    &self.cancel,
                )
                .await?
                {
                    tracing::debug!("{} continues at byte {}", target.file_name, meter.total_bytes());
                }
            }
        }

        Ok(written)
    }
}

/// Size of the local file, `None` if it does not exist
async fn local_size(path: &Path) -> Result<Option<u64>, FetchError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FetchError::filesystem(path, e)),
    }
}

async fn open_destination(path: &Path, append: bool) -> Result<File, FetchError> {
    let result = if append {
        OpenOptions::new().append(true).open(path).await
    } else {
        File::create(path).await
    };
    result.map_err(|e| FetchError::filesystem(path, e))
}

/// First byte position from a `Content-Range: bytes START-END/TOTAL` header
fn content_range_start(response: &Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

fn log_outcome(url: &Url, path: &Path, outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Completed { .. } | DownloadOutcome::Skipped(_) => {
            tracing::info!("{} -> {}: {}", url, path.display(), outcome)
        }
        DownloadOutcome::Failed { .. } => {
            tracing::error!("{} -> {}: {}", url, path.display(), outcome)
        }
        DownloadOutcome::Cancelled => {
            tracing::warn!("{} -> {}: {}", url, path.display(), outcome)
        }
    }
}
