//! Per-feed fetch policy.
//!
//! Each feed goes through one conditional fetch:
//!
//! ```text
//! START ──► FETCHING ──► SUCCESS       write artifact, remember validator
//!                   ├──► NOT_MODIFIED  carry yesterday's artifact forward
//!                   └──► ERROR         record failure, touch nothing
//! ```
//!
//! A failed carry-forward drops the cached validator so the next run asks
//! for full content again.

use crate::archive::{ArchiveStore, Period, WriteOutcome};
use crate::cache::FreshnessCache;
use crate::clock::Clock;
use crate::fetch::{FeedFetcher, FetchOutcome};
use crate::models::{Feed, FeedOutcome};
use tracing::{error, info, instrument, warn};

/// Run the fetch policy for one feed.
///
/// Issues one conditional GET, then writes the new content, carries the
/// previous day's artifact forward, or records a failure. Only this feed's
/// cache entry and artifact can change.
///
/// # Arguments
///
/// * `feed` - The feed to process
/// * `fetcher` - Performs the conditional GET
/// * `cache` - ETag cache; supplies the validator and receives the new one
/// * `archive` - Where artifacts are written or carried forward
/// * `today` - Period the artifact is filed under
/// * `clock` - Read when a new validator is stored, after the response arrived
///
/// # Returns
///
/// The [`FeedOutcome`] to record in the run statistics.
#[instrument(
    level = "info",
    skip_all,
    fields(org = %feed.organization, name = %feed.name, url = %feed.url)
)]
pub async fn process_feed<F: FeedFetcher, C: Clock>(
    feed: &Feed,
    fetcher: &F,
    cache: &mut FreshnessCache,
    archive: &ArchiveStore,
    today: Period,
    clock: &C,
) -> FeedOutcome {
    let cached = cache.etag(&feed.url).map(str::to_string);

    match fetcher.fetch(&feed.url, cached.as_deref()).await {
        Ok(FetchOutcome::Modified { body, etag }) => {
            let bytes = body.len() as u64;
            match archive
                .write(today, &feed.organization, &feed.name, &body)
                .await
            {
                Ok(outcome) => {
                    match etag {
                        Some(etag) => cache.put(
                            &feed.url,
                            &etag,
                            &feed.name,
                            &feed.organization,
                            clock.now(),
                        ),
                        None => {
                            cache.remove(&feed.url);
                        }
                    }
                    info!(
                        bytes,
                        stored = outcome == WriteOutcome::Written,
                        "Downloaded feed"
                    );
                    FeedOutcome::Success { bytes }
                }
                Err(e) => {
                    error!(error = %e, "Failed to archive feed");
                    FeedOutcome::Failed
                }
            }
        }
        Ok(FetchOutcome::NotModified) => {
            if archive.reuse_from_prior_period(feed, today).await {
                info!("Feed not modified; reused prior artifact");
                FeedOutcome::Reused
            } else {
                warn!("Feed not modified but no prior artifact; dropping cached ETag");
                cache.remove(&feed.url);
                FeedOutcome::Failed
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to download feed");
            FeedOutcome::Failed
        }
    }
}
