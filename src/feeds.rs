//! Feed list loading.
//!
//! The feed list is a YAML document, either a mapping with a `feeds` key
//! or a bare sequence of records:
//!
//! ```yaml
//! feeds:
//!   - organization: abuse_ch
//!     name: urlhaus
//!     url: https://urlhaus.abuse.ch/downloads/text/
//! ```
//!
//! Records are validated one at a time. Invalid records are logged and
//! skipped; an unreadable or unparsable file yields an empty list so the
//! run still completes with zeroed statistics.

use crate::models::Feed;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;
use tracing::{error, info, instrument, warn};
use url::Url;

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Wrapped { feeds: Vec<Value> },
    Bare(Vec<Value>),
}

/// Load and validate the feed list at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_feeds(path: &Path) -> Vec<Feed> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Failed to read feed list");
            return Vec::new();
        }
    };

    let feeds = parse_feeds(&text);
    info!(count = feeds.len(), "Loaded feeds");
    feeds
}

/// Parse a feed list document, keeping only valid records in file order.
pub fn parse_feeds(text: &str) -> Vec<Feed> {
    let records = match serde_yaml::from_str::<FeedDocument>(text) {
        Ok(FeedDocument::Wrapped { feeds }) | Ok(FeedDocument::Bare(feeds)) => feeds,
        Err(e) => {
            error!(error = %e, "Feed list is not a valid feed document");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_yaml::from_value::<Feed>(record) {
            Ok(feed) => match validate(&feed) {
                Ok(()) => Some(feed),
                Err(reason) => {
                    warn!(index, name = %feed.name, %reason, "Skipping invalid feed");
                    None
                }
            },
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed feed record");
                None
            }
        })
        .collect()
}

fn validate(feed: &Feed) -> Result<(), String> {
    for (field, value) in [("organization", &feed.organization), ("name", &feed.name)] {
        if value.trim().is_empty() {
            return Err(format!("{field} is empty"));
        }
        if value.contains(['/', '\\']) {
            return Err(format!("{field} contains a path separator"));
        }
    }

    let url = Url::parse(&feed.url).map_err(|e| format!("invalid url: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported url scheme {other:?}")),
    }
}
