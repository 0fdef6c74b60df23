//! Run summary sinks.
//!
//! The orchestrator does not log its summary through a global; it is handed
//! a [`SummarySink`] built once in `main`. Every sink receives the same
//! [`RunSummary`] and renders it as a single JSON record.
//!
//! | Sink | Destination |
//! |------|-------------|
//! | [`TracingSink`] | `info!` event carrying the JSON record |
//! | [`JsonLinesSink`] | one line appended to a file |
//! | [`TeeSink`] | both of two sinks, in order |

use crate::stats::RunSummary;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Destination for the end-of-run summary. Emitting never fails the run.
pub trait SummarySink {
    async fn emit(&self, summary: &RunSummary);
}

/// Emits the summary as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SummarySink for TracingSink {
    async fn emit(&self, summary: &RunSummary) {
        match serde_json::to_string(summary) {
            Ok(json) => info!(
                target: "run_summary",
                processed = summary.total_feeds_processed,
                success = summary.total_feeds_success,
                not_modified = summary.total_feeds_not_modified,
                failed = summary.total_feeds_failed,
                summary = %json,
                "{}",
                summary.message
            ),
            Err(e) => error!(error = %e, "Failed to serialize run summary"),
        }
    }
}

/// Appends the summary as one JSON line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SummarySink for JsonLinesSink {
    async fn emit(&self, summary: &RunSummary) {
        let mut line = match serde_json::to_string(summary) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize run summary");
                return;
            }
        };
        line.push('\n');

        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            error!(path = %self.path.display(), error = %e, "Failed to append run summary");
        }
    }
}

/// Fans one summary out to two sinks.
#[derive(Debug, Clone)]
pub struct TeeSink<A, B>(pub A, pub B);

impl<A: SummarySink, B: SummarySink> SummarySink for TeeSink<A, B> {
    async fn emit(&self, summary: &RunSummary) {
        self.0.emit(summary).await;
        self.1.emit(summary).await;
    }
}

impl<S: SummarySink> SummarySink for Option<S> {
    async fn emit(&self, summary: &RunSummary) {
        if let Some(sink) = self {
            sink.emit(summary).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::stats::RunStats;
    use std::sync::Mutex;

    /// Keeps every summary it is given.
    #[derive(Default)]
    pub(crate) struct CaptureSink(pub(crate) Mutex<Vec<RunSummary>>);

    impl CaptureSink {
        pub(crate) fn last(&self) -> RunSummary {
            self.0.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl SummarySink for CaptureSink {
        async fn emit(&self, summary: &RunSummary) {
            self.0.lock().unwrap().push(summary.clone());
        }
    }

    #[tokio::test]
    async fn test_json_lines_sink_appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let sink = JsonLinesSink::new(&path);

        sink.emit(&RunStats::new().finish()).await;
        sink.emit(&RunStats::new().finish()).await;

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RunSummary = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.total_feeds_processed, 0);
    }

    #[tokio::test]
    async fn test_tee_and_optional_sinks() {
        let sink = TeeSink(CaptureSink::default(), Some(CaptureSink::default()));
        sink.emit(&RunStats::new().finish()).await;
        assert_eq!(sink.0.0.lock().unwrap().len(), 1);
        assert_eq!(sink.1.as_ref().unwrap().0.lock().unwrap().len(), 1);

        let none: Option<CaptureSink> = None;
        none.emit(&RunStats::new().finish()).await;
    }

    #[tokio::test]
    async fn test_json_lines_sink_unwritable_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("missing/dir/runs.jsonl"));
        sink.emit(&RunStats::new().finish()).await;
    }
}
