//! Run orchestration.
//!
//! One run walks the feed list in order:
//! 1. Load the ETag cache, evict stale entries and persist immediately
//! 2. For each feed: read the clock, ensure that day's directory, apply the
//!    fetch policy, record the outcome
//! 3. Persist the ETag cache once and emit the run summary
//!
//! Feeds are processed sequentially; a failing feed never stops the run.

use crate::archive::{ArchiveStore, Period};
use crate::cache::FreshnessCache;
use crate::clock::{Clock, SystemClock};
use crate::fetch::FeedFetcher;
use crate::models::Feed;
use crate::policy::process_feed;
use crate::report::SummarySink;
use crate::stats::{RunStats, RunSummary};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Everything a run needs, constructed once in `main`.
pub struct Orchestrator<F, S> {
    fetcher: F,
    sink: S,
    archive: ArchiveStore,
    cache_path: PathBuf,
}

impl<F, S> Orchestrator<F, S>
where
    F: FeedFetcher,
    S: SummarySink,
{
    pub fn new(fetcher: F, sink: S, archive: ArchiveStore, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            sink,
            archive,
            cache_path: cache_path.into(),
        }
    }

    /// Process `feeds` against the local wall clock.
    pub async fn run(&self, feeds: &[Feed]) -> RunSummary {
        self.run_at(feeds, &SystemClock).await
    }

    /// Process `feeds`, taking every timestamp from `clock`.
    ///
    /// The clock is read once for cache eviction, once per feed to pick the
    /// archive period, and again whenever a validator is stored. A run that
    /// crosses midnight files later feeds under the new day.
    ///
    /// # Arguments
    ///
    /// * `feeds` - Feeds to process, in order
    /// * `clock` - Source of local time for this run
    ///
    /// # Returns
    ///
    /// The run summary, after it has been handed to the sink.
    #[instrument(level = "info", skip_all, fields(feeds = feeds.len(), root = %self.archive.root().display()))]
    pub async fn run_at<C: Clock>(&self, feeds: &[Feed], clock: &C) -> RunSummary {
        let mut stats = RunStats::new();
        let mut cache = FreshnessCache::load(&self.cache_path).await;
        cache.evict_expired(&self.cache_path, clock.now()).await;

        for feed in feeds {
            let today = Period::new(clock.now().date());
            self.archive.ensure_period_directory(today).await;
            let outcome =
                process_feed(feed, &self.fetcher, &mut cache, &self.archive, today, clock).await;
            debug!(name = %feed.name, ?outcome, "Feed processed");
            stats.record(feed, outcome);
        }

        // a failed save is logged by the cache and otherwise ignored
        let _ = cache.save(&self.cache_path).await;

        let summary = stats.finish();
        info!(
            processed = summary.total_feeds_processed,
            success_rate = summary.success_rate,
            elapsed_seconds = summary.elapsed_seconds,
            "Run complete"
        );
        self.sink.emit(&summary).await;
        summary
    }
}
