//! Per-run statistics and the summary record emitted at the end of a run.

use crate::models::{Feed, FeedOutcome};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Accumulator mutated once per feed during a run.
#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    processed: usize,
    succeeded: usize,
    failed: usize,
    reused: usize,
    success_feeds: Vec<String>,
    failed_feeds: Vec<String>,
    not_modified_feeds: Vec<String>,
    bytes_downloaded: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            processed: 0,
            succeeded: 0,
            failed: 0,
            reused: 0,
            success_feeds: Vec::new(),
            failed_feeds: Vec::new(),
            not_modified_feeds: Vec::new(),
            bytes_downloaded: 0,
        }
    }

    pub fn record(&mut self, feed: &Feed, outcome: FeedOutcome) {
        self.processed += 1;
        match outcome {
            FeedOutcome::Success { bytes } => {
                self.succeeded += 1;
                self.bytes_downloaded += bytes;
                self.success_feeds.push(feed.name.clone());
            }
            FeedOutcome::Reused => {
                self.reused += 1;
                self.not_modified_feeds.push(feed.name.clone());
            }
            FeedOutcome::Failed => {
                self.failed += 1;
                self.failed_feeds.push(feed.name.clone());
            }
        }
    }

    /// Freeze the accumulator into the summary record.
    pub fn finish(self) -> RunSummary {
        let (success_rate, error_rate) = if self.processed == 0 {
            (0.0, 0.0)
        } else {
            let processed = self.processed as f64;
            (
                (self.succeeded + self.reused) as f64 / processed * 100.0,
                self.failed as f64 / processed * 100.0,
            )
        };

        RunSummary {
            message: "Feed collection run complete".to_string(),
            timestamp: Local::now().to_rfc3339(),
            total_feeds_processed: self.processed,
            total_feeds_success: self.succeeded,
            total_feeds_failed: self.failed,
            total_feeds_not_modified: self.reused,
            success_feeds: self.success_feeds,
            failed_feeds: self.failed_feeds,
            not_modified_feeds: self.not_modified_feeds,
            total_bytes_downloaded: self.bytes_downloaded,
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
            success_rate,
            error_rate,
        }
    }
}

/// Structured record describing one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub message: String,
    /// ISO-8601 local timestamp of the end of the run.
    pub timestamp: String,
    pub total_feeds_processed: usize,
    pub total_feeds_success: usize,
    pub total_feeds_failed: usize,
    pub total_feeds_not_modified: usize,
    pub success_feeds: Vec<String>,
    pub failed_feeds: Vec<String>,
    pub not_modified_feeds: Vec<String>,
    pub total_bytes_downloaded: u64,
    pub elapsed_seconds: f64,
    /// `(success + not_modified) / processed * 100`, 0 for an empty run.
    pub success_rate: f64,
    /// `failed / processed * 100`, 0 for an empty run.
    pub error_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(name: &str) -> Feed {
        Feed {
            organization: "org".into(),
            name: name.into(),
            url: format!("https://example.com/{name}"),
        }
    }

    #[test]
    fn test_empty_run_has_zero_rates() {
        let summary = RunStats::new().finish();
        assert_eq!(summary.total_feeds_processed, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.error_rate, 0.0);
    }

    #[test]
    fn test_mixed_outcomes() {
        let mut stats = RunStats::new();
        stats.record(&feed("a"), FeedOutcome::Success { bytes: 10 });
        stats.record(&feed("b"), FeedOutcome::Reused);
        stats.record(&feed("c"), FeedOutcome::Failed);
        stats.record(&feed("d"), FeedOutcome::Success { bytes: 5 });

        let summary = stats.finish();
        assert_eq!(summary.total_feeds_processed, 4);
        assert_eq!(summary.total_feeds_success, 2);
        assert_eq!(summary.total_feeds_not_modified, 1);
        assert_eq!(summary.total_feeds_failed, 1);
        assert_eq!(summary.success_feeds, vec!["a", "d"]);
        assert_eq!(summary.not_modified_feeds, vec!["b"]);
        assert_eq!(summary.failed_feeds, vec!["c"]);
        assert_eq!(summary.total_bytes_downloaded, 15);
        assert_eq!(summary.success_rate, 75.0);
        assert_eq!(summary.error_rate, 25.0);
    }

    #[test]
    fn test_summary_serializes_expected_keys() {
        let value = serde_json::to_value(RunStats::new().finish()).unwrap();
        for key in [
            "message",
            "timestamp",
            "total_feeds_processed",
            "total_feeds_success",
            "total_feeds_failed",
            "total_feeds_not_modified",
            "success_feeds",
            "failed_feeds",
            "not_modified_feeds",
            "total_bytes_downloaded",
            "elapsed_seconds",
            "success_rate",
            "error_rate",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
