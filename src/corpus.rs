//! Corpus synchronization: keep one XML artifact per title on disk, current
//! to each title's latest version marker.
//!
//! The metadata feed lists every title with its `latest_amended_on` date and
//! a `reserved` flag. Reserved titles have no content to fetch and are
//! skipped permanently rather than retried each run. Failure to sync one
//! title is logged and does not abort the rest (best-effort coverage).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetch::{self, RetryPolicy};

#[derive(Debug, Deserialize)]
pub struct TitleIndex {
    pub titles: Vec<TitleSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleSummary {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    /// Version marker; absent for reserved titles.
    pub latest_amended_on: Option<String>,
    #[serde(default)]
    pub reserved: bool,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub downloaded: usize,
    pub fresh: usize,
    pub failed: usize,
    /// Titles the feed marks as having no content. The orchestrator treats
    /// references into these as permanent skips.
    pub reserved_titles: BTreeSet<u32>,
}

pub fn title_filename(number: u32) -> String {
    format!("title-{}.xml", number)
}

pub fn title_path(config: &Config, number: u32) -> PathBuf {
    config.corpus.titles_dir().join(title_filename(number))
}

/// Fetch (or serve from cache) the title metadata feed.
pub async fn fetch_title_index(
    config: &Config,
    client: &reqwest::Client,
    policy: &RetryPolicy,
) -> Result<TitleIndex> {
    let url = format!("{}/api/versioner/v1/titles.json", config.corpus.base_url);
    let cache_path = config.corpus.data_dir.join("titles_meta.json");
    let bytes =
        fetch::fetch_and_cache(client, &url, &cache_path, config.corpus.max_age(), policy).await?;
    serde_json::from_slice(&bytes).with_context(|| "Failed to parse title metadata feed")
}

/// Fetch (or serve from cache) the raw agency feed.
pub async fn fetch_agency_feed(
    config: &Config,
    client: &reqwest::Client,
    policy: &RetryPolicy,
) -> Result<Vec<u8>> {
    let url = format!("{}/api/admin/v1/agencies.json", config.corpus.base_url);
    let cache_path = config.corpus.data_dir.join("agencies/agencies.json");
    fetch::fetch_and_cache(client, &url, &cache_path, config.corpus.max_age(), policy).await
}

/// Ensure every non-reserved title is present and no older than the
/// freshness threshold, downloading the full XML at its exact version
/// marker where needed.
pub async fn sync_titles(
    config: &Config,
    client: &reqwest::Client,
    policy: &RetryPolicy,
) -> Result<SyncReport> {
    let index = fetch_title_index(config, client, policy).await?;
    let mut report = SyncReport::default();

    for title in &index.titles {
        if title.reserved {
            report.reserved_titles.insert(title.number);
            continue;
        }

        let path = title_path(config, title.number);
        if fetch::is_fresh(&path, config.corpus.max_age()) {
            report.fresh += 1;
            continue;
        }

        let Some(date) = title.latest_amended_on.as_deref() else {
            warn!(title = title.number, "title has no version marker, skipping");
            report.failed += 1;
            continue;
        };

        let url = format!(
            "{}/api/versioner/v1/full/{}/title-{}.xml",
            config.corpus.base_url, date, title.number
        );
        match download_title(client, &url, &path, policy).await {
            Ok(()) => {
                info!(title = title.number, version = date, "downloaded title");
                report.downloaded += 1;
            }
            Err(e) => {
                warn!(title = title.number, error = %e, "failed to sync title, continuing");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

async fn download_title(
    client: &reqwest::Client,
    url: &str,
    path: &std::path::Path,
    policy: &RetryPolicy,
) -> Result<()> {
    let bytes = fetch::fetch_with_retry(client, url, policy).await?;
    fetch::write_atomic(path, &bytes)
}
