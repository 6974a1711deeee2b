//! Sumi-Search main entry point
//!
//! Command-line interface for the Sumi-Search crawler and search API.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_search::config::{load_config_with_hash, Config};
use sumi_search::crawler::{coordinator_from_config, CancelFlag, CrawlJob, JobState};
use sumi_search::index::{open_index, IndexClient};
use sumi_search::server::{AppState, HttpServer};
use tracing_subscriber::EnvFilter;

/// Sumi-Search: crawl pages and serve full-text search over them
///
/// By default the HTTP API is served. `--crawl` runs a single crawl job
/// from the command line instead, and `--stats` / `--clear` operate on the
/// index directly.
#[derive(Parser, Debug)]
#[command(name = "sumi-search")]
#[command(version)]
#[command(about = "Crawl, extract and search web pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl these URLs into the index and exit
    #[arg(long, value_name = "URL", num_args = 1.., conflicts_with_all = ["stats", "clear", "dry_run"])]
    crawl: Vec<String>,

    /// Depth for --crawl (defaults to the configured max depth)
    #[arg(long, requires = "crawl")]
    max_depth: Option<u32>,

    /// Show index statistics and exit
    #[arg(long, conflicts_with_all = ["clear", "dry_run"])]
    stats: bool,

    /// Remove every document from the index and exit
    #[arg(long, conflicts_with = "dry_run")]
    clear: bool,

    /// Validate config and show the effective settings without serving
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let index = open(&config)?;

    if cli.stats {
        handle_stats(index)
    } else if cli.clear {
        handle_clear(index)
    } else if !cli.crawl.is_empty() {
        handle_crawl(&config, index, cli.crawl, cli.max_depth).await
    } else {
        handle_serve(&config, index).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "sumi_search=info,tower_http=info,warn",
            1 => "sumi_search=debug,tower_http=debug,info",
            2 => "sumi_search=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open(config: &Config) -> Result<Arc<dyn IndexClient>> {
    let path = Path::new(&config.index.database_path);
    let index = open_index(path)
        .with_context(|| format!("Failed to open index at {}", path.display()))?;
    tracing::info!("Index opened at {}", path.display());
    Ok(Arc::new(index))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Search Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Default max depth: {}", config.crawler.max_depth);
    println!("  Max depth limit: {}", config.crawler.max_depth_limit);
    println!("  Max concurrent fetches: {}", config.crawler.max_concurrent);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Content length: {}..{} chars",
        config.crawler.min_content_length, config.crawler.max_content_length
    );
    match config.crawler.max_pages_per_job {
        Some(n) => println!("  Pages per job: {}", n),
        None => println!("  Pages per job: unlimited"),
    }
    match config.crawler.job_timeout_secs {
        Some(n) => println!("  Job timeout: {}s", n),
        None => println!("  Job timeout: none"),
    }
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    println!("  Stay on seed hosts: {}", config.crawler.stay_on_seed_hosts);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nIndex:");
    println!("  Database: {}", config.index.database_path);

    println!("\nServer:");
    println!("  Listen address: {}", config.server.listen_addr);
    println!("  Permissive CORS: {}", config.server.cors_permissive);

    println!(
        "\nBlocked Domains ({}):",
        config.crawler.blocked_domains.len()
    );
    for pattern in &config.crawler.blocked_domains {
        println!("  - {}", pattern);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode
fn handle_stats(index: Arc<dyn IndexClient>) -> Result<()> {
    let stats = index.stats().context("Failed to read index stats")?;

    println!("Documents: {}", stats.document_count);
    println!("Indexing: {}", stats.is_indexing);
    println!("Field distribution:");
    for (field, count) in &stats.field_distribution {
        println!("  {:<12} {}", field, count);
    }

    Ok(())
}

/// Handles the --clear mode
fn handle_clear(index: Arc<dyn IndexClient>) -> Result<()> {
    index.clear_all().context("Failed to clear index")?;
    println!("✓ Index cleared");
    Ok(())
}

/// Handles the --crawl mode: one job, cancelled by Ctrl-C
async fn handle_crawl(
    config: &Config,
    index: Arc<dyn IndexClient>,
    urls: Vec<String>,
    max_depth: Option<u32>,
) -> Result<()> {
    let depth = max_depth.unwrap_or(config.crawler.max_depth);
    if depth > config.crawler.max_depth_limit {
        anyhow::bail!(
            "--max-depth {} exceeds the configured limit of {}",
            depth,
            config.crawler.max_depth_limit
        );
    }

    let job = CrawlJob::new(urls, depth)?;
    let coordinator = coordinator_from_config(config, index)?;

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_signal.cancel();
        }
    });

    tracing::info!("Crawling {} seed URL(s) to depth {}", job.seeds.len(), depth);
    let summary = coordinator.run(job, cancel).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.state == JobState::Failed {
        anyhow::bail!(
            "Crawl failed: {}",
            summary.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

/// Serves the HTTP API until Ctrl-C
async fn handle_serve(config: &Config, index: Arc<dyn IndexClient>) -> Result<()> {
    let coordinator = coordinator_from_config(config, Arc::clone(&index))?;
    let state = AppState::new(index, coordinator);
    let server = HttpServer::new(config.server.clone(), state);

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}
