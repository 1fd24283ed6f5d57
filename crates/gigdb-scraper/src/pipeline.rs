//! Listing and detail runs for one site.
//!
//! A listing run loads the site's listing page, drives the load-more
//! controller when the site has a target date, and writes the deduplicated
//! listings as the worklist. A detail run walks that worklist one entity at
//! a time, snapshots each detail page, and appends enriched records as it
//! goes. Per-entity failures never stop a run; a missing worklist does.

use std::time::Duration;

use chrono::NaiveDate;
use gigdb_core::{AppConfig, EnrichedRecord, ListingRecord, SiteConfig};

use crate::dedupe::dedupe_listings;
use crate::error::ScraperError;
use crate::extract::{extract_detail, extract_listings, DetailOptions};
use crate::load_more::{rendered_card_count, run_load_more, LoadMoreSettings};
use crate::rate_limit::{load_with_retry, Cooldown, RetryPolicy};
use crate::session::{PageSession, PageSnapshot};
use crate::sink::{snapshot_path, RecordSink};

/// Knobs for listing and detail runs.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub settle_delay: Duration,
    pub detail_cooldown: Duration,
    pub max_load_more_clicks: u32,
    pub retry: RetryPolicy,
    /// Run date; anchors year inference for listing date markers.
    pub reference_date: NaiveDate,
    /// Process at most this many worklist entries in a detail run.
    pub detail_limit: Option<usize>,
}

impl RunSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, reference_date: NaiveDate) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            detail_cooldown: config.detail_cooldown(),
            max_load_more_clicks: config.max_load_more_clicks,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_secs: config.retry_backoff_base_secs,
            },
            reference_date,
            detail_limit: None,
        }
    }

    #[must_use]
    pub fn with_detail_limit(mut self, limit: Option<usize>) -> Self {
        self.detail_limit = limit;
        self
    }
}

/// Counts for one detail or re-extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub enriched: usize,
    pub failed: usize,
    /// Entities emitted without enrichment because there was nothing to load.
    pub skipped: usize,
}

/// Load, expand, and extract a site's listing page without writing anything.
///
/// # Errors
///
/// [`ScraperError::Session`] when the listing page cannot be loaded after
/// retries. Load-more problems only end the expansion early.
pub async fn collect_listings<S: PageSession>(
    session: &mut S,
    site: &SiteConfig,
    settings: &RunSettings,
) -> Result<Vec<ListingRecord>, ScraperError> {
    let url = site.listing_url();
    tracing::info!(site = %site.name, url = %url, "loading listing page");
    let first = load_with_retry(session, &url, settings.settle_delay, settings.retry).await?;

    let snapshot = match site.target_date {
        Some(target_date) => expand_listing(session, first, target_date, settings).await,
        None => first,
    };

    let records = dedupe_listings(extract_listings(&snapshot, site));
    tracing::info!(site = %site.name, count = records.len(), "listings extracted");
    Ok(records)
}

async fn expand_listing<S: PageSession>(
    session: &mut S,
    first: PageSnapshot,
    target_date: NaiveDate,
    settings: &RunSettings,
) -> PageSnapshot {
    let load_settings = LoadMoreSettings {
        target_date,
        reference_date: settings.reference_date,
        settle_delay: settings.settle_delay,
        max_iterations: settings.max_load_more_clicks,
    };
    let state = run_load_more(session, &load_settings).await;
    if state.clicks_performed == 0 {
        return first;
    }

    match session.snapshot().await {
        Ok(expanded) => {
            tracing::debug!(
                clicks = state.clicks_performed,
                cards = rendered_card_count(&expanded.html),
                "listing page expanded"
            );
            expanded
        }
        Err(err) => {
            tracing::warn!(error = %err, "snapshot after load-more failed; using first load");
            first
        }
    }
}

/// Collect a site's listings and write them as its detail worklist.
///
/// # Errors
///
/// Page-load failures from [`collect_listings`] and sink write failures.
pub async fn run_listings<S: PageSession, K: RecordSink>(
    session: &mut S,
    site: &SiteConfig,
    settings: &RunSettings,
    sink: &K,
) -> Result<Vec<ListingRecord>, ScraperError> {
    let records = collect_listings(session, site, settings).await?;
    sink.write_listings(&site.slug(), &records)?;
    Ok(records)
}

fn read_worklist<K: RecordSink>(
    site: &SiteConfig,
    sink: &K,
    limit: Option<usize>,
) -> Result<Vec<ListingRecord>, ScraperError> {
    let mut worklist = dedupe_listings(sink.read_listings(&site.slug())?);
    if let Some(limit) = limit {
        worklist.truncate(limit);
    }
    Ok(worklist)
}

fn detail_url_of(listing: &ListingRecord) -> Option<String> {
    listing
        .detail_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Enrich every worklist entry from its detail page.
///
/// Entries are processed sequentially with a cooldown between fetches. Each
/// result is appended to the sink as soon as it exists, so an interrupted
/// run keeps everything produced so far.
///
/// # Errors
///
/// [`SinkError::WorklistMissing`](crate::error::SinkError::WorklistMissing)
/// before any page is touched, or a sink write failure. Page-load failures
/// are recorded per entity and never returned.
pub async fn run_details<S: PageSession, K: RecordSink>(
    session: &mut S,
    site: &SiteConfig,
    settings: &RunSettings,
    sink: &K,
) -> Result<RunSummary, ScraperError> {
    let name = site.slug();
    let worklist = read_worklist(site, sink, settings.detail_limit)?;
    sink.reset_enriched(&name)?;

    tracing::info!(site = %site.name, entities = worklist.len(), "starting detail run");
    let mut summary = RunSummary::default();
    let mut cooldown = Cooldown::new(settings.detail_cooldown);

    for listing in worklist {
        summary.total += 1;

        let Some(url) = detail_url_of(&listing) else {
            tracing::debug!(identity = %listing.identity, "no detail URL; emitting listing only");
            summary.skipped += 1;
            let record = EnrichedRecord::unenriched(listing, Some("no detail URL".to_string()));
            sink.append_enriched(&name, &record)?;
            continue;
        };

        cooldown.wait().await;

        let record = match load_with_retry(session, &url, settings.settle_delay, settings.retry).await {
            Ok(snapshot) => {
                summary.enriched += 1;
                enrich(site, sink, listing, &snapshot)
            }
            Err(err) => {
                tracing::warn!(
                    identity = %listing.identity,
                    url = %url,
                    error = %err,
                    "detail page failed; emitting listing without enrichment"
                );
                summary.failed += 1;
                EnrichedRecord::unenriched(listing, Some(err.to_string()))
            }
        };
        sink.append_enriched(&name, &record)?;
    }

    tracing::info!(
        site = %site.name,
        total = summary.total,
        enriched = summary.enriched,
        failed = summary.failed,
        skipped = summary.skipped,
        "detail run complete"
    );
    Ok(summary)
}

fn enrich<K: RecordSink>(
    site: &SiteConfig,
    sink: &K,
    listing: ListingRecord,
    snapshot: &PageSnapshot,
) -> EnrichedRecord {
    let name = site.slug();
    let saved = match sink.save_snapshot(&name, &listing.identity, &snapshot.html) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::warn!(identity = %listing.identity, error = %err, "could not save snapshot");
            None
        }
    };

    let options = DetailOptions::for_listing(site, &listing);
    let detail = extract_detail(snapshot, &options);
    if detail.is_empty() {
        tracing::debug!(identity = %listing.identity, "detail page yielded no fields");
    }

    let record = EnrichedRecord::new(listing, detail);
    match saved {
        Some(path) => record.with_snapshot(path),
        None => record,
    }
}

/// Rebuild the detail output from saved snapshots without fetching.
///
/// Entities without a saved snapshot are emitted unenriched and counted as
/// skipped.
///
/// # Errors
///
/// A missing worklist, or sink read/write failures.
pub fn reextract<K: RecordSink>(site: &SiteConfig, sink: &K) -> Result<RunSummary, ScraperError> {
    let name = site.slug();
    let worklist = read_worklist(site, sink, None)?;
    sink.reset_enriched(&name)?;

    let mut summary = RunSummary::default();
    for listing in worklist {
        summary.total += 1;

        let record = match sink.load_snapshot(&name, &listing.identity)? {
            Some(html) => {
                let snapshot = PageSnapshot {
                    url: detail_url_of(&listing).unwrap_or_else(|| listing.identity.clone()),
                    html,
                };
                let options = DetailOptions::for_listing(site, &listing);
                let detail = extract_detail(&snapshot, &options);
                let path = snapshot_path(&name, &listing.identity);
                summary.enriched += 1;
                EnrichedRecord::new(listing, detail).with_snapshot(path)
            }
            None => {
                summary.skipped += 1;
                EnrichedRecord::unenriched(listing, Some("no saved snapshot".to_string()))
            }
        };
        sink.append_enriched(&name, &record)?;
    }

    tracing::info!(
        site = %site.name,
        total = summary.total,
        enriched = summary.enriched,
        skipped = summary.skipped,
        "re-extraction complete"
    );
    Ok(summary)
}
