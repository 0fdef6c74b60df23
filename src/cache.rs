//! ETag freshness cache persisted between runs.
//!
//! The cache maps a feed URL to the last validator the origin handed out
//! for it, together with the feed identity and the local time the validator
//! was acquired. It is stored as a single JSON object:
//!
//! ```json
//! {
//!   "https://example.com/feed1.xml": {
//!     "etag": "\"33a64df551425fcc55e4d42a148795d9f25f89d4\"",
//!     "feed_name": "Feed 1",
//!     "feed_organization": "Organization 1",
//!     "download_date": "2023-07-21T14:30:16.123456"
//!   }
//! }
//! ```
//!
//! # Failure Model
//!
//! Loading never fails: a missing or corrupt file is an empty cache, and
//! individual malformed entries are dropped. Saving reports errors to the
//! caller after logging them; callers treat them as non-fatal.
//!
//! # Expiry
//!
//! Entries older than [`STALENESS_HOURS`] are evicted at the start of every
//! run so that a "reuse yesterday's artifact" decision is never made on a
//! validator that has not been confirmed by the origin for more than a day.

use crate::models::CacheEntry;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// Maximum age of a cache entry before it is evicted.
pub const STALENESS_HOURS: i64 = 24;

/// In-memory view of the freshness cache file.
///
/// Owns its entries; all mutation goes through methods so at most one
/// entry exists per URL.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FreshnessCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl FreshnessCache {
    /// Load the cache from `path`.
    ///
    /// Returns an empty cache when the file is missing or unreadable.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let cache = Self::from_json(&text);
                info!(entries = cache.len(), "Loaded ETag cache");
                cache
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No ETag cache found; starting empty");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read ETag cache; starting empty");
                Self::default()
            }
        }
    }

    /// Parse cache JSON, dropping entries that do not have the expected shape.
    pub fn from_json(text: &str) -> Self {
        let object = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                warn!("ETag cache is not a JSON object; ignoring it");
                return Self::default();
            }
            Err(e) => {
                warn!(error = %e, "ETag cache is not valid JSON; ignoring it");
                return Self::default();
            }
        };

        let mut entries = BTreeMap::new();
        for (url, value) in object {
            match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) => {
                    entries.insert(url, entry);
                }
                Err(e) => warn!(%url, error = %e, "Dropping malformed ETag cache entry"),
            }
        }
        Self { entries }
    }

    /// Write the full cache to `path`, replacing the previous file.
    #[instrument(level = "info", skip_all, fields(path = %path.display(), entries = self.len()))]
    pub async fn save(&self, path: &Path) -> io::Result<()> {
        let result = async {
            let json = serde_json::to_vec(self).map_err(io::Error::other)?;
            tokio::fs::write(path, json).await
        }
        .await;

        match &result {
            Ok(()) => debug!("Saved ETag cache"),
            Err(e) => error!(error = %e, "Failed to write ETag cache"),
        }
        result
    }

    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    /// The cached validator for `url`, if any.
    pub fn etag(&self, url: &str) -> Option<&str> {
        self.get(url).map(|entry| entry.etag.as_str())
    }

    /// Insert or replace the entry for `url`.
    ///
    /// `download_date` is the local time the validator was acquired; callers
    /// read it from their clock at the moment the response is accepted.
    pub fn put(
        &mut self,
        url: &str,
        etag: &str,
        feed_name: &str,
        feed_organization: &str,
        download_date: NaiveDateTime,
    ) {
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                etag: etag.to_string(),
                feed_name: feed_name.to_string(),
                feed_organization: feed_organization.to_string(),
                download_date,
            },
        );
    }

    /// Remove the entry for `url`. Absent URLs are a no-op.
    pub fn remove(&mut self, url: &str) -> Option<CacheEntry> {
        self.entries.remove(url)
    }

    /// Drop every entry acquired more than [`STALENESS_HOURS`] before `now`.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_older_than(&mut self, now: NaiveDateTime) -> usize {
        let horizon = Duration::hours(STALENESS_HOURS);
        let before = self.entries.len();
        self.entries.retain(|url, entry| {
            let keep = now - entry.download_date <= horizon;
            if !keep {
                debug!(%url, download_date = %entry.download_date, "Evicting stale ETag");
            }
            keep
        });
        before - self.entries.len()
    }

    /// Evict stale entries and immediately persist the result to `path`.
    ///
    /// The save happens even when nothing was evicted so the file on disk
    /// matches memory before any feed is processed. A failed save is logged
    /// and otherwise ignored.
    ///
    /// # Arguments
    ///
    /// * `path` - Cache file to rewrite
    /// * `now` - Local time the [`STALENESS_HOURS`] horizon is measured from
    ///
    /// # Returns
    ///
    /// The number of evicted entries.
    pub async fn evict_expired(&mut self, path: &Path, now: NaiveDateTime) -> usize {
        let evicted = self.evict_older_than(now);
        if evicted > 0 {
            info!(evicted, remaining = self.len(), "Evicted stale ETags");
        }
        let _ = self.save(path).await;
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 7, 21)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sample() -> FreshnessCache {
        let mut cache = FreshnessCache::default();
        cache.put("https://dummyurl.com/feed1.xml", "etag1", "Feed 1", "Organization 1", at(14, 30));
        cache.put("https://dummyurl.com/feed2.xml", "etag2", "Feed 2", "Organization 2", at(14, 35));
        cache
    }

    #[test]
    fn test_from_json_reads_historical_format() {
        let json = r#"{
            "https://example.com/feed1.xml": {
                "etag": "\"33a64df551425fcc55e4d42a148795d9f25f89d4\"",
                "feed_name": "Feed 1",
                "feed_organization": "Organization 1",
                "download_date": "2023-07-21T14:30:16.123456"
            }
        }"#;
        let cache = FreshnessCache::from_json(json);
        let entry = cache.get("https://example.com/feed1.xml").unwrap();
        assert_eq!(entry.etag, "\"33a64df551425fcc55e4d42a148795d9f25f89d4\"");
        assert_eq!(entry.feed_organization, "Organization 1");
        assert_eq!(
            entry.download_date,
            NaiveDate::from_ymd_opt(2023, 7, 21)
                .unwrap()
                .and_hms_micro_opt(14, 30, 16, 123456)
                .unwrap()
        );
    }

    #[test]
    fn test_from_json_drops_malformed_entries() {
        let json = r#"{
            "https://ok.example/": {"etag": "a", "feed_name": "n", "feed_organization": "o", "download_date": "2023-07-21T14:30:16"},
            "https://no-date.example/": {"etag": "a", "feed_name": "n", "feed_organization": "o"},
            "https://bad-date.example/": {"etag": "a", "feed_name": "n", "feed_organization": "o", "download_date": "yesterday"},
            "https://not-object.example/": 7
        }"#;
        let cache = FreshnessCache::from_json(json);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.etag("https://ok.example/"), Some("a"));
    }

    #[test]
    fn test_from_json_corrupt_is_empty() {
        assert_eq!(FreshnessCache::from_json("{not json").len(), 0);
        assert_eq!(FreshnessCache::from_json("[1, 2, 3]").len(), 0);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FreshnessCache::load(&dir.path().join("missing.json")).await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etag_cache.json");
        let mut cache = sample();
        cache.put(
            "https://dummyurl.com/feed3.xml",
            "etag3",
            "Feed 3",
            "Organization 3",
            Local::now().naive_local(),
        );

        cache.save(&path).await.unwrap();
        let loaded = FreshnessCache::load(&path).await;
        assert_eq!(loaded, cache);
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/cache.json");
        assert!(sample().save(&path).await.is_err());
    }

    #[test]
    fn test_put_upserts_single_entry_per_url() {
        let mut cache = sample();
        cache.put("https://dummyurl.com/feed1.xml", "etag1b", "Feed 1", "Organization 1", at(15, 0));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.etag("https://dummyurl.com/feed1.xml"), Some("etag1b"));
    }

    #[test]
    fn test_remove_present_and_absent() {
        let mut cache = sample();
        assert!(cache.remove("https://dummyurl.com/feed1.xml").is_some());
        assert!(cache.get("https://dummyurl.com/feed1.xml").is_none());

        assert!(cache.remove("https://nonexistenturl.com/feed3.xml").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evict_older_than_horizon() {
        let now = at(14, 0);
        let mut cache = FreshnessCache::default();
        cache.put("https://old.example/", "e", "old", "o", now - Duration::hours(25));
        cache.put("https://fresh.example/", "e", "fresh", "o", now - Duration::hours(23));
        cache.put("https://edge.example/", "e", "edge", "o", now - Duration::hours(24));

        assert_eq!(cache.evict_older_than(now), 1);
        assert!(cache.get("https://old.example/").is_none());
        assert!(cache.get("https://fresh.example/").is_some());
        assert!(cache.get("https://edge.example/").is_some());
    }

    #[tokio::test]
    async fn test_evict_expired_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etag_cache.json");
        let now = Local::now().naive_local();

        let mut cache = FreshnessCache::default();
        cache.put("https://old.example/", "e", "old", "o", now - Duration::hours(25));
        cache.put("https://fresh.example/", "e", "fresh", "o", now - Duration::hours(23));

        assert_eq!(cache.evict_expired(&path, now).await, 1);
        let on_disk = FreshnessCache::load(&path).await;
        assert_eq!(on_disk, cache);
        assert_eq!(on_disk.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_expired_on_empty_cache_still_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etag_cache.json");
        let mut cache = FreshnessCache::default();

        assert_eq!(cache.evict_expired(&path, Local::now().naive_local()).await, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
