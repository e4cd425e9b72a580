//! HTTP fetcher for listing pages
//!
//! This module handles the requests the crawler itself makes:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests for listing pages, following redirects
//! - Retry with exponential backoff on network trouble and HTTP 503

use crate::config::Config;
use crate::retry::{sleep_or_cancel, RetryPolicy};
use crate::FetchError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Redirect hops followed before a listing fetch is abandoned
const MAX_REDIRECTS: usize = 10;

/// A fetched listing page
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// URL after redirects; relative hrefs resolve against it
    pub final_url: Url,

    /// Raw HTML body
    pub body: String,
}

/// Builds the HTTP client shared by the crawler and the downloader
///
/// The client carries no overall timeout, because file transfers may run for
/// hours. Listing fetches and size probes set per-request timeouts instead.
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::config::Config;
/// use sumi_mirror::crawler::build_http_client;
///
/// let config = Config::for_root("https://example.com/pub/", "mirror");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .connect_timeout(config.http.connect_timeout())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one listing page, without retrying
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection refused, timeout, TLS, body read | `TransientNetwork` |
/// | HTTP 503 | `ServerUnavailable` |
/// | Any other non-2xx | `HttpStatus` |
pub async fn fetch_listing(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<ListingPage, FetchError> {
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::from_status(url, status));
    }

    let final_url = response.url().clone();
    if final_url != *url {
        tracing::debug!("{} redirected to {}", url, final_url);
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::network(url, e))?;

    Ok(ListingPage { final_url, body })
}

/// Fetches a listing page, retrying transient failures under `policy`
///
/// Returns the page and the number of attempts made. Statuses other than 503
/// end the fetch on the first answer; the caller stops that branch.
pub async fn fetch_listing_with_retry(
    client: &Client,
    url: &Url,
    policy: &RetryPolicy,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(ListingPage, u32), (FetchError, u32)> {
    let mut retry = policy.state();
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return Err((FetchError::Cancelled, attempts));
        }
        attempts += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err((FetchError::Cancelled, attempts)),
            result = fetch_listing(client, url, timeout) => result,
        };

        let error = match result {
            Ok(page) => return Ok((page, attempts)),
            Err(e) if e.is_page_retryable() => e,
            Err(e) => return Err((e, attempts)),
        };

        match retry.record_failure() {
            Some(delay) => {
                tracing::warn!(
                    "Listing {} attempt {}/{} failed: {}; retrying in {:?}",
                    url,
                    attempts,
                    retry.max_attempts(),
                    error,
                    delay
                );
                if !sleep_or_cancel(delay, cancel).await {
                    return Err((FetchError::Cancelled, attempts));
                }
            }
            None => return Err((error, attempts)),
        }
    }
}
