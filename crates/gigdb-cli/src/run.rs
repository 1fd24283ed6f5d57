//! Command handlers.
//!
//! Called from `main` once config and the sites file are loaded. Listing
//! runs cover many sites and log per-site failures instead of aborting;
//! detail and re-extraction runs target one site and fail loudly when its
//! worklist is missing.

use chrono::Local;
use gigdb_core::{AppConfig, SiteConfig, SitesFile};
use gigdb_scraper::{HttpSession, JsonFileSink, RunSettings, RunSummary};

/// Resolve the sites a command applies to.
///
/// `Some(name)` must match exactly one configured site by name or slug.
pub(crate) fn select_sites<'a>(
    sites: &'a SitesFile,
    filter: Option<&str>,
) -> anyhow::Result<Vec<&'a SiteConfig>> {
    match filter {
        Some(name) => {
            let site = sites
                .find(name)
                .ok_or_else(|| anyhow::anyhow!("site '{name}' not found in sites file"))?;
            Ok(vec![site])
        }
        None => Ok(sites.sites.iter().collect()),
    }
}

fn settings(config: &AppConfig) -> RunSettings {
    RunSettings::from_config(config, Local::now().date_naive())
}

fn session(config: &AppConfig) -> anyhow::Result<HttpSession> {
    HttpSession::new(config.page_load_timeout(), &config.user_agent)
        .map_err(|e| anyhow::anyhow!("failed to build page session: {e}"))
}

/// Collect listings for every selected site.
///
/// # Errors
///
/// Returns an error if the site filter matches nothing or the session cannot
/// be built. Per-site load and write failures are logged and skipped.
pub(crate) async fn run_listings_command(
    config: &AppConfig,
    sites: &SitesFile,
    filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let selected = select_sites(sites, filter)?;
    let settings = settings(config);
    let sink = JsonFileSink::new(config.output_dir.clone());
    let mut session = session(config)?;

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for site in &selected {
        let result = if dry_run {
            gigdb_scraper::collect_listings(&mut session, site, &settings).await
        } else {
            gigdb_scraper::run_listings(&mut session, site, &settings, &sink).await
        };

        match result {
            Ok(records) => {
                succeeded += 1;
                if dry_run {
                    println!("dry-run: {} listings found for {}", records.len(), site.slug());
                } else {
                    println!("{}: {} listings written", site.slug(), records.len());
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!(site = %site.name, error = %e, "listing run failed");
            }
        }
    }

    println!(
        "listing runs complete: {succeeded} succeeded, {failed} failed (of {})",
        selected.len()
    );
    Ok(())
}

/// Enrich one site's worklist.
///
/// # Errors
///
/// Returns an error if the site is unknown, its worklist is missing, or the
/// output cannot be written. Per-entity page failures are only counted.
pub(crate) async fn run_details_command(
    config: &AppConfig,
    sites: &SitesFile,
    site: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let site = select_sites(sites, Some(site))?[0];
    let settings = settings(config).with_detail_limit(limit);
    let sink = JsonFileSink::new(config.output_dir.clone());
    let mut session = session(config)?;

    let summary = gigdb_scraper::run_details(&mut session, site, &settings, &sink)
        .await
        .map_err(|e| {
            if e.is_worklist_missing() {
                anyhow::anyhow!("{e}; run `gigdb-cli listings --site {}` first", site.slug())
            } else {
                anyhow::Error::new(e)
            }
        })?;

    print_summary("details", site, summary);
    Ok(())
}

/// Re-derive one site's detail output from its saved snapshots.
///
/// # Errors
///
/// Returns an error if the site is unknown, its worklist is missing, or the
/// sink cannot be read or written.
pub(crate) fn run_reextract_command(
    config: &AppConfig,
    sites: &SitesFile,
    site: &str,
) -> anyhow::Result<()> {
    let site = select_sites(sites, Some(site))?[0];
    let sink = JsonFileSink::new(config.output_dir.clone());
    let summary = gigdb_scraper::reextract(site, &sink)?;
    print_summary("reextract", site, summary);
    Ok(())
}

fn print_summary(command: &str, site: &SiteConfig, summary: RunSummary) {
    println!(
        "{command} {}: {} total, {} enriched, {} failed, {} skipped",
        site.slug(),
        summary.total,
        summary.enriched,
        summary.failed,
        summary.skipped
    );
}
