//! Integration tests for Sumi-Mirror
//!
//! These tests run the crawler and the downloader against wiremock servers
//! and check the resulting local trees.

mod download_tests;

use std::sync::Arc;
use std::time::Duration;
use sumi_mirror::config::Config;
use sumi_mirror::crawler::{build_http_client, CrawlSettings, Crawler};
use sumi_mirror::download::{DownloadSettings, Downloader, NeverPause, SharedPauseGate};
use sumi_mirror::RetryPolicy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Retry policy whose backoff "seconds" last one millisecond
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, 2.0, 0.0).with_time_unit(Duration::from_millis(1))
}

/// Deterministic, non-repeating-looking file content
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::for_root(format!("{}/", server.uri()), "unused");
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

pub fn download_settings(chunk_size: usize) -> DownloadSettings {
    DownloadSettings {
        chunk_size,
        retry: fast_retry(3),
        pause_poll_interval: Duration::from_millis(10),
        probe_timeout: Duration::from_secs(5),
        ..DownloadSettings::default()
    }
}

pub fn test_downloader(
    settings: DownloadSettings,
    pause: SharedPauseGate,
    cancel: CancellationToken,
) -> Downloader {
    let client = build_http_client(&Config::for_root("http://localhost/", "unused"))
        .expect("Failed to build client");
    Downloader::new(client, settings, pause, cancel)
}

pub fn test_crawler(
    server: &MockServer,
    max_depth: u32,
    settings: DownloadSettings,
    pause: SharedPauseGate,
    cancel: CancellationToken,
) -> Crawler {
    let mut config = test_config(server);
    config.mirror.max_depth = max_depth;
    crawler_from_config(&config, settings, pause, cancel)
}

/// Crawler for `config` with millisecond page backoff
pub fn crawler_from_config(
    config: &Config,
    settings: DownloadSettings,
    pause: SharedPauseGate,
    cancel: CancellationToken,
) -> Crawler {
    let client = build_http_client(config).expect("Failed to build client");
    let crawl_settings = CrawlSettings {
        page_retry: fast_retry(3),
        ..CrawlSettings::from_config(config)
    };
    let downloader = Downloader::new(client.clone(), settings, pause, cancel.clone());

    Crawler::new(client, crawl_settings, downloader, cancel)
}

pub fn simple_crawler(server: &MockServer, max_depth: u32) -> Crawler {
    test_crawler(
        server,
        max_depth,
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    )
}

/// Serves `body` at `route` for HEAD (size probe) and plain GET
pub async fn mount_file(server: &MockServer, route: &str, body: &[u8]) {
    // HEAD carries the body so the server reports its Content-Length
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Range request mock serving the tail of `body` from `offset`
///
/// Must be mounted before [`mount_file`] so it wins over the plain GET.
pub fn range_mock(route: &str, body: &[u8], offset: usize) -> Mock {
    let range = format!("bytes={}-", offset);
    let content_range = format!("bytes {}-{}/{}", offset, body.len() - 1, body.len());
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("range", range.as_str()))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", content_range.as_str())
                .set_body_bytes(body[offset..].to_vec()),
        )
}

/// Serves an HTML listing at `route`
pub async fn mount_listing(server: &MockServer, route: &str, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|href| format!("<tr><td><a href=\"{0}\">{0}</a></td></tr>\n", href))
        .collect();
    let html = format!(
        "<html><head><title>Index of {0}</title></head><body><h1>Index of {0}</h1>\
         <table><tr><th><a href=\"?C=N;O=D\">Name</a></th></tr>\n\
         <tr><td><a href=\"../\">Parent Directory</a></td></tr>\n{1}</table></body></html>",
        route, anchors
    );

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Raw HTTP server whose file bodies arrive in full but never finish
///
/// HEAD answers with the body length. GET sends the whole body as one chunk,
/// then holds the connection open without the terminating chunk.
pub async fn spawn_stalling_server(body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                if request.starts_with(b"HEAD") {
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    return;
                }

                let mut response = format!(
                    "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n",
                    body.len()
                )
                .into_bytes();
                response.extend_from_slice(&body);
                response.extend_from_slice(b"\r\n");
                let _ = socket.write_all(&response).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    format!("http://{}", addr)
}
