//! End-to-end `update` pipeline: listing → sources → CSV → monthly/yearly JSON → index.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use url::Url;

use twcal_fetch::Fetcher;
use twcal_normalize::TextDecoder;
use twcal_publish::Publisher;
use twcal_shared::{CalendarError, CalendarSource, IndexEntry, OutputProfile, Result};

/// Configuration for [`run_update`].
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Dataset listing page; also sent as `Referer` for CSV downloads.
    pub dataset_url: String,
    /// Base URL that relative download links are resolved against.
    pub link_base: Url,
    /// Output root directory.
    pub output_root: PathBuf,
    pub profile: OutputProfile,
}

/// A source that was skipped after failing.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub title: String,
    pub url: String,
    pub error: String,
}

/// Outcome of a [`run_update`] call.
#[derive(Debug)]
pub struct UpdateResult {
    /// Years written, in processing order (descending).
    pub processed_years: Vec<i32>,
    pub failures: Vec<SourceFailure>,
    /// Entries of the regenerated `index.json`.
    pub index_entries: Vec<IndexEntry>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a candidate source is fetched.
    fn source_started(&self, source: &CalendarSource, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &UpdateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_started(&self, _source: &CalendarSource, _current: usize, _total: usize) {}
    fn done(&self, _result: &UpdateResult) {}
}

/// Fetch the listing page and parse it into dated sources.
///
/// Fails with `CatalogFetch` if the page cannot be retrieved and with
/// `EmptyCatalog` if it advertises no dated source.
#[instrument(skip_all, fields(dataset_url = %dataset_url))]
pub async fn fetch_catalog<F: Fetcher>(
    fetcher: &F,
    dataset_url: &str,
    link_base: &Url,
) -> Result<Vec<CalendarSource>> {
    let html = fetcher
        .fetch_text(dataset_url)
        .await
        .map_err(|e| CalendarError::CatalogFetch {
            url: dataset_url.to_string(),
            message: e.to_string(),
        })?;

    let sources = twcal_catalog::parse_sources(&html, link_base);
    if sources.is_empty() {
        return Err(CalendarError::EmptyCatalog {
            url: dataset_url.to_string(),
        });
    }
    Ok(sources)
}

/// Run the full update.
///
/// 1. Fetch and parse the catalog
/// 2. Rank candidates, one year at a time, newest first
/// 3. Per candidate: download, decode, normalize, write months and roll-up
/// 4. Regenerate the index
///
/// Per-source failures are logged and recorded; the next candidate of the
/// same year, if any, is tried instead. A source's files are written as a
/// unit, so a failed source leaves nothing behind for the index to pick up,
/// and its year is marked done only after that write succeeds.
#[instrument(skip_all, fields(dataset_url = %config.dataset_url, profile = %config.profile))]
pub async fn run_update<F: Fetcher>(
    config: &UpdateConfig,
    fetcher: &F,
    decoder: &dyn TextDecoder,
    progress: &dyn ProgressReporter,
) -> Result<UpdateResult> {
    let start = Instant::now();
    info!(decoder = decoder.name(), "starting update");

    progress.phase("Fetching catalog");
    let sources = fetch_catalog(fetcher, &config.dataset_url, &config.link_base).await?;
    let candidates = twcal_catalog::rank_candidates(&sources);

    let publisher = Publisher::new(&config.output_root, config.profile);
    let mut processed: HashSet<i32> = HashSet::new();
    let mut processed_years = Vec::new();
    let mut failures = Vec::new();

    progress.phase("Processing sources");
    let total = candidates.len();
    for (i, source) in candidates.iter().enumerate() {
        if processed.contains(&source.year) {
            debug!(title = %source.title, year = source.year, "year already processed, skipping");
            continue;
        }
        progress.source_started(source, i + 1, total);

        match process_source(source, config, fetcher, decoder, &publisher).await {
            Ok(()) => {
                processed.insert(source.year);
                processed_years.push(source.year);
            }
            Err(e) if e.is_source_recoverable() => {
                warn!(title = %source.title, url = %source.url, error = %e, "source failed, skipping");
                failures.push(SourceFailure {
                    title: source.title.clone(),
                    url: source.url.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    progress.phase("Generating index");
    let index_entries = publisher.write_index()?;

    let result = UpdateResult {
        processed_years,
        failures,
        index_entries,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        years = result.processed_years.len(),
        failures = result.failures.len(),
        index_entries = result.index_entries.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "update complete"
    );

    Ok(result)
}

/// Regenerate `index.json` from whatever is already under the output root.
pub fn rebuild_index(output_root: &std::path::Path, profile: OutputProfile) -> Result<Vec<IndexEntry>> {
    Publisher::new(output_root, profile).write_index()
}

/// Download, decode, normalize and persist a single source.
#[instrument(skip_all, fields(year = source.year, title = %source.title))]
async fn process_source<F: Fetcher>(
    source: &CalendarSource,
    config: &UpdateConfig,
    fetcher: &F,
    decoder: &dyn TextDecoder,
    publisher: &Publisher,
) -> Result<()> {
    let bytes = fetcher
        .fetch_bytes(&source.url, &config.dataset_url)
        .await
        .map_err(|e| CalendarError::SourceFetch {
            url: source.url.clone(),
            message: e.to_string(),
        })?;

    let text = decoder.decode(&bytes)?;
    let months = twcal_normalize::normalize(&text, source)?;

    let files = publisher.write_source(&months)?;

    info!(months = files.months.len(), "source processed");
    Ok(())
}
