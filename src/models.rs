//! Data models shared across the archiver.
//!
//! - [`Feed`]: one configured data feed, validated at load time
//! - [`CacheEntry`]: the freshness metadata remembered for one feed URL
//! - [`FeedOutcome`]: what happened to one feed during a run

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A configured data feed.
///
/// Identity is the `(organization, name)` pair; both are used verbatim as
/// parts of the artifact filename, so the loader rejects values containing
/// path separators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Feed {
    /// The organization publishing the feed.
    #[serde(alias = "org")]
    pub organization: String,
    /// Short feed name, unique within its organization.
    pub name: String,
    /// Absolute `http`/`https` URL the feed is downloaded from.
    pub url: String,
}

/// Freshness metadata for one feed URL, as persisted in the cache file.
///
/// The on-disk shape is
/// `{"etag": ..., "feed_name": ..., "feed_organization": ..., "download_date": ...}`
/// with `download_date` an ISO-8601 local timestamp without offset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheEntry {
    /// Opaque validator returned by the origin (an HTTP `ETag` value).
    pub etag: String,
    pub feed_name: String,
    pub feed_organization: String,
    /// Local time at which the validator was acquired.
    pub download_date: NaiveDateTime,
}

/// Result of processing one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Fresh content was downloaded; `bytes` is the body size.
    Success { bytes: u64 },
    /// The origin reported no change and a prior artifact was carried forward.
    Reused,
    /// The feed could not be fetched or archived.
    Failed,
}
