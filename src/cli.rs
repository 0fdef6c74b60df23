//! Command-line interface definitions for Feed Archive.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The three paths are required flags; tuning options can also come from
//! environment variables.

use crate::fetch::FetchConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the Feed Archive application.
///
/// # Examples
///
/// ```sh
/// # Basic usage with required arguments
/// feed_archive -f feeds.yaml -c etag_cache.json -w ./archive
///
/// # Tighter timeouts and no retries
/// feed_archive -f feeds.yaml -c etag_cache.json -w ./archive --timeout-secs 10 --retries 0
///
/// # Also append the run summary to a JSON-lines file
/// feed_archive -f feeds.yaml -c etag_cache.json -w ./archive --summary-file runs.jsonl
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file containing the feeds
    #[arg(short, long)]
    pub feeds: PathBuf,

    /// JSON file holding the ETag cache between runs
    #[arg(short, long)]
    pub cache: PathBuf,

    /// The root of the archive directory
    #[arg(short, long)]
    pub workdir: PathBuf,

    /// Total per-request timeout in seconds
    #[arg(long, env = "FEED_ARCHIVE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Extra attempts for transient fetch failures
    #[arg(long, env = "FEED_ARCHIVE_RETRIES", default_value_t = 2)]
    pub retries: usize,

    /// User-Agent header sent with every request
    #[arg(long, default_value = concat!("feed_archive/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Append the run summary as a JSON line to this file
    #[arg(long, env = "FEED_ARCHIVE_SUMMARY_FILE")]
    pub summary_file: Option<PathBuf>,
}

impl Cli {
    /// Build the fetcher configuration from the parsed flags.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            retries: self.retries,
            base_delay: Duration::from_secs(1),
            user_agent: self.user_agent.clone(),
        }
    }
}
