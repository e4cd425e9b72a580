//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror directory mirror.

use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_mirror::config::{load_config_with_hash, validate_config, Config};
use sumi_mirror::crawler::mirror;
use sumi_mirror::download::ManualPauseGate;
use sumi_mirror::output::{generate_markdown_summary, print_statistics};
use sumi_mirror::MirrorError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: a resumable directory-listing mirror
///
/// Sumi-Mirror walks server-rendered directory listings and copies every
/// file into a matching local folder tree. Interrupted transfers resume
/// where they stopped; files already complete are skipped.
///
/// While running, type `p` + Enter to pause transfers and `r` + Enter to
/// resume them. Ctrl-C stops the run at the next checkpoint.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version = "1.0.0")]
#[command(about = "A resumable directory-listing mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "url")]
    config: Option<PathBuf>,

    /// Root listing URL (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Destination folder (overrides the config file)
    #[arg(long)]
    dest: Option<String>,

    /// Deepest listing level to visit; the root is level 0
    #[arg(long)]
    max_depth: Option<u32>,

    /// Soft transfer ceiling in bytes per second (0 = unlimited)
    #[arg(long)]
    speed_limit: Option<u64>,

    /// Files of one listing transferred at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_mirror(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file, if any, and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            let url = cli.url.clone().unwrap_or_default();
            Config::for_root(url, "downloaded_files")
        }
    };

    if let Some(url) = &cli.url {
        config.mirror.root_url = url.clone();
    }
    if let Some(dest) = &cli.dest {
        config.mirror.destination = dest.clone();
    }
    if let Some(depth) = cli.max_depth {
        config.mirror.max_depth = depth;
    }
    if let Some(limit) = cli.speed_limit {
        config.transfer.speed_limit = Some(limit);
    }
    if let Some(concurrency) = cli.concurrency {
        config.transfer.max_concurrent_downloads = concurrency;
    }

    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Mirror:");
    println!("  Root URL: {}", config.mirror.root_url);
    println!("  Destination: {}", config.mirror.destination);
    println!("  Max depth: {}", config.mirror.max_depth);

    println!("\nRetry:");
    println!(
        "  Listing pages: {} attempts, floor {}s",
        config.retry.page_max_attempts, config.retry.page_backoff_floor_secs
    );
    println!(
        "  Files: {} attempts, floor {}s",
        config.retry.file_max_attempts, config.retry.file_backoff_floor_secs
    );
    println!("  Backoff base: {}", config.retry.backoff_base);

    println!("\nTransfer:");
    match config.transfer.effective_speed_limit() {
        Some(limit) => println!("  Speed limit: {} B/s", limit),
        None => println!("  Speed limit: unlimited"),
    }
    println!("  Chunk size: {} bytes", config.transfer.chunk_size);
    println!(
        "  Concurrent downloads: {}",
        config.transfer.max_concurrent_downloads
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    if let Some(summary) = &config.output.summary_path {
        println!("\nSummary: {}", summary);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main mirror operation
async fn handle_mirror(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let gate = ManualPauseGate::shared();

    spawn_interrupt_listener(cancel.clone());
    spawn_pause_listener(gate.clone());

    let report = match mirror(&config, gate, cancel).await {
        Ok(report) => report,
        Err(MirrorError::Cancelled) => {
            tracing::warn!("Cancelled before the root listing was fetched");
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            return Err(e.into());
        }
    };

    if report.is_cancelled() {
        tracing::warn!("Mirror cancelled; rerun to resume partial files");
    } else if report.is_success() {
        tracing::info!("Mirror completed successfully");
    } else {
        tracing::warn!("Mirror finished with failures");
    }

    print_statistics(&report.statistics());

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_summary(&report, Path::new(summary_path))
            .with_context(|| format!("Failed to write summary {}", summary_path))?;
        println!("\n✓ Summary written to: {}", summary_path);
    }

    Ok(())
}

/// Cancels the run on Ctrl-C
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next checkpoint");
            cancel.cancel();
        }
    });
}

/// Drives the pause gate from stdin lines: `p` pauses, `r` resumes
///
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
fn spawn_pause_listener(gate: Arc<ManualPauseGate>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "p" => {
                    gate.pause();
                    tracing::info!("Transfers paused; type 'r' to resume");
                }
                "r" => {
                    gate.resume();
                    tracing::info!("Transfers resumed");
                }
                "" => {}
                other => tracing::debug!("Ignoring input {:?}", other),
            }
        }
    });
}
