//! Calendar source catalog: listing parsing and authoritative source selection.
//!
//! The dataset page advertises one or more CSV resources per year: the
//! original publication, corrected re-publications, and an unofficial Google
//! Calendar mirror. This crate turns the page into [`CalendarSource`]s and
//! picks the single source each year should be built from.

mod parser;

use std::collections::{BTreeMap, HashSet};

use scraper::Html;
use tracing::{debug, info, instrument};
use url::Url;

use twcal_shared::CalendarSource;

pub use parser::{ListingEntry, extract_year, is_google_variant, is_revised};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a listing document into dated calendar sources, in discovery order.
///
/// Relative download links are resolved against `link_base`. Entries whose
/// label carries no `NNN年` token are dropped.
#[instrument(skip_all, fields(link_base = %link_base))]
pub fn parse_sources(listing_html: &str, link_base: &Url) -> Vec<CalendarSource> {
    let doc = Html::parse_document(listing_html);
    let entries = parser::extract_entries(&doc, link_base);

    let sources: Vec<CalendarSource> = entries
        .into_iter()
        .filter_map(|entry| {
            let source = source_from_entry(entry);
            if source.is_none() {
                debug!("dropping listing entry without a year token");
            }
            source
        })
        .collect();

    for source in &sources {
        info!(title = %source.title, year = source.year, "found calendar source");
    }
    info!(count = sources.len(), "catalog parsed");

    sources
}

/// Attach year and variant metadata to a listing entry.
pub fn source_from_entry(entry: ListingEntry) -> Option<CalendarSource> {
    let year = extract_year(&entry.title)?;
    Some(CalendarSource {
        year,
        is_google_variant: is_google_variant(&entry.title),
        is_revised: is_revised(&entry.title),
        title: entry.title,
        url: entry.url,
    })
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// All non-Google sources in processing order.
///
/// Years descend; within a year revised publications come first, ties keep
/// discovery order. The head of each year group is that year's authoritative
/// source, the rest are fallbacks.
pub fn rank_candidates(sources: &[CalendarSource]) -> Vec<CalendarSource> {
    let mut by_year: BTreeMap<i32, Vec<(usize, &CalendarSource)>> = BTreeMap::new();

    for (index, source) in sources.iter().enumerate() {
        if source.is_google_variant {
            debug!(title = %source.title, "skipping Google Calendar mirror");
            continue;
        }
        by_year.entry(source.year).or_default().push((index, source));
    }

    by_year
        .into_iter()
        .rev()
        .flat_map(|(_, mut candidates)| {
            candidates.sort_by_key(|(index, source)| (!source.is_revised, *index));
            candidates.into_iter().map(|(_, source)| source.clone())
        })
        .collect()
}

/// Exactly one source per year, years descending.
pub fn select_authoritative(sources: &[CalendarSource]) -> Vec<CalendarSource> {
    let mut years = HashSet::new();
    rank_candidates(sources)
        .into_iter()
        .filter(|source| years.insert(source.year))
        .collect()
}
