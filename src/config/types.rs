use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: u32 = 5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_BASE: f64 = 2.0;
pub const DEFAULT_CHUNK_SIZE: usize = 8192;
pub const DEFAULT_PAUSE_POLL_MS: u64 = 1000;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Builds a configuration with defaults for everything but the mirror target
    pub fn for_root(root_url: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            mirror: MirrorConfig {
                root_url: root_url.into(),
                destination: destination.into(),
                max_depth: DEFAULT_MAX_DEPTH,
            },
            retry: RetryConfig::default(),
            transfer: TransferConfig::default(),
            http: HttpConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// What to mirror and where
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Listing page the traversal starts from
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Local directory the listing tree is mirrored under
    pub destination: String,

    /// Deepest listing level visited; the root page is depth 0
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,
}

/// Retry and backoff behavior for pages and files
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "page-max-attempts", default = "default_max_attempts")]
    pub page_max_attempts: u32,

    #[serde(rename = "file-max-attempts", default = "default_max_attempts")]
    pub file_max_attempts: u32,

    /// Delay before attempt n is `backoff-base ^ n` seconds
    #[serde(rename = "backoff-base", default = "default_backoff_base")]
    pub backoff_base: f64,

    #[serde(rename = "page-backoff-floor-secs", default)]
    pub page_backoff_floor_secs: f64,

    #[serde(rename = "file-backoff-floor-secs", default)]
    pub file_backoff_floor_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            page_max_attempts: DEFAULT_MAX_ATTEMPTS,
            file_max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            page_backoff_floor_secs: 0.0,
            file_backoff_floor_secs: 0.0,
        }
    }
}

/// Streaming behavior of file transfers
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Soft throughput ceiling in bytes per second (absent or 0 means unlimited)
    #[serde(rename = "speed-limit", default)]
    pub speed_limit: Option<u64>,

    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(rename = "max-concurrent-downloads", default = "default_concurrency")]
    pub max_concurrent_downloads: usize,

    #[serde(rename = "pause-poll-interval-ms", default = "default_pause_poll_ms")]
    pub pause_poll_interval_ms: u64,
}

impl TransferConfig {
    pub fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_interval_ms)
    }

    /// The configured limit, with 0 treated as unlimited
    pub fn effective_speed_limit(&self) -> Option<u64> {
        self.speed_limit.filter(|limit| *limit > 0)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            speed_limit: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_downloads: default_concurrency(),
            pause_poll_interval_ms: DEFAULT_PAUSE_POLL_MS,
        }
    }
}

/// HTTP client timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Applies to listing fetches and size probes, never to file bodies
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Longest silence tolerated while waiting for file body bytes
    #[serde(rename = "read-timeout-secs", default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            page_timeout_secs: default_page_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiMirror".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the markdown run summary, if anywhere
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_base() -> f64 {
    DEFAULT_BACKOFF_BASE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    1
}

fn default_pause_poll_ms() -> u64 {
    DEFAULT_PAUSE_POLL_MS
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_page_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}
