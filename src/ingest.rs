//! Ingestion orchestration.
//!
//! Drives the end-to-end run: sync the corpus, resolve agency scopes, then
//! for every agency count each reference's subtree (consulting the result
//! cache first) and upsert one metrics row. Per-agency persistence is
//! isolated — one agency's failure is logged and the batch continues. Only
//! the sync and scope-resolution phases, which have no per-item granularity,
//! abort the run.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::config::Config;
use crate::corpus;
use crate::count::count_subtree;
use crate::db;
use crate::document::parse_document;
use crate::fetch::{self, RetryPolicy};
use crate::models::{CfrReference, CountResult};
use crate::navigate::locate;
use crate::result_cache::ResultCache;
use crate::scope;
use crate::store;

/// Counts accumulated over one run. Every per-item outcome lands in exactly
/// one bucket, so skip and failure totals are assertable on their own.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub titles_downloaded: usize,
    pub titles_fresh: usize,
    pub titles_failed: usize,
    pub agencies_upserted: usize,
    pub agencies_failed: usize,
    pub refs_counted: usize,
    pub cache_hits: usize,
    pub refs_skipped_missing: usize,
    pub parse_failures: usize,
    pub total_sections: u64,
    pub total_words: u64,
}

/// Run the full pipeline, honoring the configured run deadline when set.
pub async fn run_ingest(config: &Config) -> Result<IngestReport> {
    match config.ingest.deadline() {
        Some(deadline) => tokio::time::timeout(deadline, ingest_inner(config))
            .await
            .map_err(|_| {
                anyhow!(
                    "ingestion run exceeded its {}s deadline",
                    config.ingest.run_deadline_secs
                )
            })?,
        None => ingest_inner(config).await,
    }
}

async fn ingest_inner(config: &Config) -> Result<IngestReport> {
    let client = fetch::build_client(&config.fetch)?;
    let policy = RetryPolicy::from_config(&config.fetch);

    // Phase 1: corpus sync. Total failure here (unreachable metadata feed)
    // aborts the run; prior cache state is left intact for a later retry.
    let sync = corpus::sync_titles(config, &client, &policy)
        .await
        .with_context(|| "Corpus sync failed")?;

    // Phase 2: agency scopes, rebuilt wholesale each run.
    let feed_bytes = corpus::fetch_agency_feed(config, &client, &policy)
        .await
        .with_context(|| "Failed to fetch agency feed")?;
    let feed = scope::parse_agency_feed(&feed_bytes)?;
    let scopes = scope::resolve_agency_scopes(&feed);

    let pool = db::connect(config).await?;
    let cache = ResultCache::new(config.corpus.counts_dir());

    let mut report = IngestReport {
        titles_downloaded: sync.downloaded,
        titles_fresh: sync.fresh,
        titles_failed: sync.failed,
        ..Default::default()
    };

    // Phase 3/4: count and persist, one agency at a time.
    for (name, refs) in &scopes {
        match process_agency(config, &pool, &cache, &sync.reserved_titles, name, refs, &mut report)
            .await
        {
            Ok(totals) => {
                report.agencies_upserted += 1;
                report.total_sections += totals.section_count;
                report.total_words += totals.word_count;
            }
            Err(e) => {
                error!(agency = %name, error = %e, "failed to persist agency metrics, continuing");
                report.agencies_failed += 1;
            }
        }
    }

    pool.close().await;
    Ok(report)
}

async fn process_agency(
    config: &Config,
    pool: &SqlitePool,
    cache: &ResultCache,
    reserved_titles: &std::collections::BTreeSet<u32>,
    name: &str,
    refs: &[CfrReference],
    report: &mut IngestReport,
) -> Result<CountResult> {
    let mut totals = CountResult::default();

    for reference in refs {
        totals.add(count_reference(config, cache, reserved_titles, reference, report));
    }

    store::upsert_agency_metrics(pool, name, refs, totals).await?;
    Ok(totals)
}

/// Resolve one reference to counts. Missing or reserved titles, structural
/// mismatches, and parse failures all contribute (0, 0) without failing the
/// agency.
fn count_reference(
    config: &Config,
    cache: &ResultCache,
    reserved_titles: &std::collections::BTreeSet<u32>,
    reference: &CfrReference,
    report: &mut IngestReport,
) -> CountResult {
    if reserved_titles.contains(&reference.title) {
        warn!(title = reference.title, "reference names a reserved title, skipping");
        report.refs_skipped_missing += 1;
        return CountResult::default();
    }

    let path = corpus::title_path(config, reference.title);
    let filename = corpus::title_filename(reference.title);

    if !path.exists() {
        warn!(title = reference.title, path = %path.display(), "title artifact missing, skipping");
        report.refs_skipped_missing += 1;
        return CountResult::default();
    }

    let key = ResultCache::key(&filename, reference);
    if let Some(hit) = cache.get(&key) {
        report.cache_hits += 1;
        return hit;
    }

    let xml = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(title = reference.title, error = %e, "title artifact unreadable, skipping");
            report.refs_skipped_missing += 1;
            return CountResult::default();
        }
    };

    let root = match parse_document(&xml) {
        Ok(root) => root,
        Err(e) => {
            error!(title = reference.title, error = %e, "title failed to parse, counting zero");
            report.parse_failures += 1;
            return CountResult::default();
        }
    };

    // NotFound is an expected outcome of imprecise scope data: zero counts,
    // and the zero is as cacheable as any other deterministic result.
    let result = locate(&root, reference)
        .map(count_subtree)
        .unwrap_or_default();

    if let Err(e) = cache.put(&key, &result) {
        warn!(error = %e, "failed to write count cache entry");
    }

    report.refs_counted += 1;
    result
}
