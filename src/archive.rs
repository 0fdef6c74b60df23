//! Date-partitioned archive of gzip-compressed feed artifacts.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! └── 2025/
//!     └── 05/
//!         └── 06/
//!             ├── 2025_05_06_abuse_ch_urlhaus.txt.gz
//!             └── 2025_05_06_spamhaus_drop.txt.gz
//! ```
//!
//! There is at most one artifact per `(period, organization, name)`. When an
//! artifact already exists for today, a new download only replaces it if its
//! compressed size is strictly larger (see [`should_replace`]).

use crate::models::Feed;
use chrono::{Datelike, NaiveDate};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Errors raised while writing an artifact.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to compress content: {0}")]
    Compress(#[source] io::Error),
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The calendar-day partition an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period(NaiveDate);

impl Period {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The day before this one.
    pub fn previous(&self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }

    /// Relative directory for this period, `YYYY/MM/DD`.
    pub fn directory(&self) -> PathBuf {
        let d = self.0;
        PathBuf::from(format!("{:04}", d.year()))
            .join(format!("{:02}", d.month()))
            .join(format!("{:02}", d.day()))
    }

    /// Filename prefix for this period, `YYYY_MM_DD`.
    pub fn stamp(&self) -> String {
        self.0.format("%Y_%m_%d").to_string()
    }
}

/// Whether [`ArchiveStore::write`] stored the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
}

/// Gzip `content` exactly as it is stored in the archive.
pub fn compress(content: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    encoder.finish()
}

/// Decide whether new content should overwrite the artifact at `existing`.
///
/// `compressed` is the new content already in archive encoding (see
/// [`compress`]), so the caller can write the very buffer that was measured.
/// Always true when nothing exists at `existing`; otherwise true only if the
/// new compressed length is strictly greater than the stored artifact's
/// length. Nothing is written to disk for the comparison.
pub async fn should_replace(existing: &Path, compressed: &[u8]) -> Result<bool, ArchiveError> {
    let new_len = compressed.len() as u64;
    let existing_len = match tokio::fs::metadata(existing).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(source) => {
            return Err(ArchiveError::Inspect {
                path: existing.to_path_buf(),
                source,
            });
        }
    };
    debug!(path = %existing.display(), existing_len, new_len, "Compared compressed sizes");
    Ok(new_len > existing_len)
}

/// The archive rooted at a working directory.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute directory for `period`.
    pub fn period_dir(&self, period: Period) -> PathBuf {
        self.root.join(period.directory())
    }

    /// Path of the artifact for `(period, organization, name)`.
    pub fn artifact_path(&self, period: Period, organization: &str, name: &str) -> PathBuf {
        self.period_dir(period).join(format!(
            "{}_{}_{}.txt.gz",
            period.stamp(),
            organization,
            name
        ))
    }

    /// Create the directory for `period` if needed.
    ///
    /// Failure is logged, not returned; writes into the missing directory
    /// will fail and be reported per feed.
    #[instrument(level = "debug", skip(self))]
    pub async fn ensure_period_directory(&self, period: Period) -> PathBuf {
        let dir = self.period_dir(period);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            error!(path = %dir.display(), error = %e, "Failed to create period directory");
        }
        dir
    }

    /// Store `content` as the artifact for `(period, organization, name)`.
    ///
    /// The content is compressed once; the same buffer is measured by
    /// [`should_replace`] and then written, so an existing artifact is only
    /// overwritten by something strictly larger.
    ///
    /// # Arguments
    ///
    /// * `period` - Day the artifact is filed under; its directory must exist
    /// * `organization` - Feed organization, part of the filename
    /// * `name` - Feed name, part of the filename
    /// * `content` - Uncompressed body as downloaded
    ///
    /// # Returns
    ///
    /// [`WriteOutcome::Written`] if the file was (re)written,
    /// [`WriteOutcome::Skipped`] if an existing artifact was kept, or an
    /// [`ArchiveError`] if compressing, inspecting or writing failed.
    #[instrument(level = "info", skip(self, content), fields(bytes = content.len()))]
    pub async fn write(
        &self,
        period: Period,
        organization: &str,
        name: &str,
        content: &[u8],
    ) -> Result<WriteOutcome, ArchiveError> {
        let path = self.artifact_path(period, organization, name);

        let compressed = compress(content).map_err(ArchiveError::Compress)?;
        if !should_replace(&path, &compressed).await? {
            info!(path = %path.display(), "Existing artifact is at least as large; keeping it");
            return Ok(WriteOutcome::Skipped);
        }

        tokio::fs::write(&path, &compressed)
            .await
            .map_err(|source| ArchiveError::Write {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), compressed = compressed.len(), "Wrote artifact");
        Ok(WriteOutcome::Written)
    }

    /// Satisfy `today` for `feed` by carrying the previous day's artifact forward.
    ///
    /// - today's artifact already exists: `true`, nothing copied
    /// - yesterday's artifact is missing: `false`
    /// - otherwise copy it (keeping its modification time when possible)
    ///   and report whether the copy succeeded
    #[instrument(level = "info", skip(self, feed), fields(org = %feed.organization, name = %feed.name))]
    pub async fn reuse_from_prior_period(&self, feed: &Feed, today: Period) -> bool {
        let today_path = self.artifact_path(today, &feed.organization, &feed.name);
        let yesterday_path = self.artifact_path(today.previous(), &feed.organization, &feed.name);

        if is_file(&today_path).await {
            debug!(path = %today_path.display(), "Today's artifact already present");
            return true;
        }
        if !is_file(&yesterday_path).await {
            warn!(path = %yesterday_path.display(), "No prior artifact to reuse");
            return false;
        }

        if let Err(e) = tokio::fs::copy(&yesterday_path, &today_path).await {
            error!(
                from = %yesterday_path.display(),
                to = %today_path.display(),
                error = %e,
                "Failed to copy prior artifact"
            );
            return false;
        }
        if let Err(e) = preserve_mtime(&yesterday_path, &today_path).await {
            debug!(error = %e, "Could not preserve modification time");
        }
        info!(from = %yesterday_path.display(), to = %today_path.display(), "Reused prior artifact");
        true
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn preserve_mtime(from: &Path, to: &Path) -> io::Result<()> {
    let modified = tokio::fs::metadata(from).await?.modified()?;
    let file = tokio::fs::OpenOptions::new().write(true).open(to).await?;
    file.into_std().await.set_modified(modified)
}
