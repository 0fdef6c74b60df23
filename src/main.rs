//! # Feed Archive
//!
//! Periodically downloads a configured set of web-hosted data feeds and keeps
//! a date-partitioned, gzip-compressed copy of each one, without re-downloading
//! or re-storing content the origin reports as unchanged.
//!
//! ## Usage
//!
//! ```sh
//! feed_archive -f feeds.yaml -c etag_cache.json -w ./archive
//! ```
//!
//! ## Architecture
//!
//! 1. **Feeds**: load and validate the YAML feed list
//! 2. **Cache**: load the ETag cache and evict entries older than 24 hours
//! 3. **Policy**: per feed, conditional GET, then write or carry forward
//! 4. **Summary**: persist the cache and emit one JSON run summary

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod archive;
mod cache;
mod cli;
mod clock;
mod feeds;
mod fetch;
mod models;
mod policy;
mod report;
mod run;
mod stats;

use archive::ArchiveStore;
use cli::Cli;
use fetch::{HttpFetcher, RetryFetch};
use report::{JsonLinesSink, TeeSink, TracingSink};
use run::Orchestrator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    info!(
        feeds = %args.feeds.display(),
        cache = %args.cache.display(),
        workdir = %args.workdir.display(),
        "feed_archive starting up"
    );

    let config = args.fetch_config();
    let fetcher = RetryFetch::new(HttpFetcher::new(&config)?, config.retries, config.base_delay);
    let sink = TeeSink(TracingSink, args.summary_file.as_ref().map(JsonLinesSink::new));
    let orchestrator = Orchestrator::new(
        fetcher,
        sink,
        ArchiveStore::new(&args.workdir),
        &args.cache,
    );

    let feeds = feeds::load_feeds(&args.feeds).await;
    let summary = orchestrator.run(&feeds).await;

    info!(
        elapsed_seconds = summary.elapsed_seconds,
        failed = summary.total_feeds_failed,
        "Execution complete"
    );
    Ok(())
}
