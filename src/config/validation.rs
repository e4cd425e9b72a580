use crate::config::types::{Config, HttpConfig, MirrorConfig, RetryConfig, TransferConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

const MIN_CHUNK_SIZE: usize = 512;
const MAX_CHUNK_SIZE: usize = 1024 * 1024;
const MAX_CONCURRENT_DOWNLOADS: usize = 32;
const MIN_PAUSE_POLL_MS: u64 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_mirror_config(&config.mirror)?;
    validate_retry_config(&config.retry)?;
    validate_transfer_config(&config.transfer)?;
    validate_http_config(&config.http)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the mirror target
fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.root_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid root-url '{}': {}", config.root_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root-url '{}' must use http or https",
            config.root_url
        )));
    }

    if url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "root-url '{}' must not carry a query string",
            config.root_url
        )));
    }

    if config.destination.trim().is_empty() {
        return Err(ConfigError::Validation(
            "destination cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.page_max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "page-max-attempts must be >= 1, got {}",
            config.page_max_attempts
        )));
    }

    if config.file_max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "file-max-attempts must be >= 1, got {}",
            config.file_max_attempts
        )));
    }

    if !config.backoff_base.is_finite() || config.backoff_base <= 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-base must be a finite number > 1, got {}",
            config.backoff_base
        )));
    }

    for (name, floor) in [
        ("page-backoff-floor-secs", config.page_backoff_floor_secs),
        ("file-backoff-floor-secs", config.file_backoff_floor_secs),
    ] {
        if !floor.is_finite() || floor < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a finite number >= 0, got {}",
                name, floor
            )));
        }
    }

    Ok(())
}

/// Validates transfer configuration
fn validate_transfer_config(config: &TransferConfig) -> Result<(), ConfigError> {
    if config.chunk_size < MIN_CHUNK_SIZE || config.chunk_size > MAX_CHUNK_SIZE {
        return Err(ConfigError::Validation(format!(
            "chunk-size must be between {} and {}, got {}",
            MIN_CHUNK_SIZE, MAX_CHUNK_SIZE, config.chunk_size
        )));
    }

    if config.max_concurrent_downloads < 1
        || config.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS
    {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and {}, got {}",
            MAX_CONCURRENT_DOWNLOADS, config.max_concurrent_downloads
        )));
    }

    if config.pause_poll_interval_ms < MIN_PAUSE_POLL_MS {
        return Err(ConfigError::Validation(format!(
            "pause-poll-interval-ms must be >= {}ms, got {}ms",
            MIN_PAUSE_POLL_MS, config.pause_poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates HTTP timeouts
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.read_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "read-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    Ok(())
}
