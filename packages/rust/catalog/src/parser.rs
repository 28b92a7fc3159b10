//! Listing page extraction.
//!
//! The dataset page groups its resources as `.od-table ul > li` rows, each with
//! a `<span>` label and a download link pointing at a `FileConversion`
//! endpoint or a `.csv` file. When that structure is missing, every
//! `FileConversion` link in the document is considered instead.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use twcal_shared::ROC_YEAR_OFFSET;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A labelled download link found on the listing page, before year parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Trimmed label text.
    pub title: String,
    /// Absolute download URL.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Selectors and patterns (compiled once)
// ---------------------------------------------------------------------------

static GROUP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".od-table ul").expect("group selector"));

static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("item selector"));

static LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("label selector"));

static DOWNLOAD_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="FileConversion"], a[href*=".csv"]"#).expect("download selector")
});

static CONVERSION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="FileConversion"]"#).expect("conversion selector")
});

/// Three ASCII digits followed by 年, e.g. `114年`.
static ROC_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{3})年").expect("year regex"));

/// Title markers for corrected, revised and updated publications.
const REVISED_MARKERS: [&str; 3] = ["修正", "修訂", "更新"];

// ---------------------------------------------------------------------------
// Title metadata
// ---------------------------------------------------------------------------

/// Gregorian year from a `NNN年` token in the title, if any.
pub fn extract_year(title: &str) -> Option<i32> {
    let caps = ROC_YEAR_RE.captures(title)?;
    let roc: i32 = caps[1].parse().ok()?;
    Some(roc + ROC_YEAR_OFFSET)
}

/// Title advertises the Google Calendar mirror.
pub fn is_google_variant(title: &str) -> bool {
    title.to_lowercase().contains("google")
}

/// Title advertises a corrected/revised/updated publication.
pub fn is_revised(title: &str) -> bool {
    REVISED_MARKERS.iter().any(|m| title.contains(m))
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract labelled download links, using the fallback pass when the
/// structured scan finds nothing.
///
/// Entries without a year token are still returned here; year filtering
/// happens when they are turned into sources.
pub(crate) fn extract_entries(doc: &Html, base: &Url) -> Vec<ListingEntry> {
    let structured = extract_structured(doc, base);
    if structured.iter().any(|e| extract_year(&e.title).is_some()) {
        return structured;
    }

    debug!("structured listing yielded no dated entries, scanning all conversion links");
    extract_fallback(doc, base)
}

/// Scan `.od-table ul` groups for `<li>` rows carrying a label and a link.
fn extract_structured(doc: &Html, base: &Url) -> Vec<ListingEntry> {
    let mut entries = Vec::new();

    for group in doc.select(&GROUP_SEL) {
        for item in group.select(&ITEM_SEL) {
            let title = label_text(item);
            let href = item
                .select(&DOWNLOAD_SEL)
                .next()
                .and_then(|a| a.value().attr("href"));

            let Some(href) = href else { continue };
            if title.is_empty() {
                continue;
            }

            if let Some(url) = resolve_link(base, href) {
                entries.push(ListingEntry { title, url });
            }
        }
    }

    entries
}

/// Every `FileConversion` link in the document, labelled by its own text or
/// by the `<span>` of the enclosing `<li>`.
///
/// Only dated labels are kept, so an undated link never shadows a later
/// dated link to the same URL. The first dated entry per URL wins.
fn extract_fallback(doc: &Html, base: &Url) -> Vec<ListingEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for link in doc.select(&CONVERSION_SEL) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let own_text = link.text().collect::<String>().trim().to_string();
        let title = if own_text.is_empty() {
            enclosing_item(link).map(label_text).unwrap_or_default()
        } else {
            own_text
        };

        if extract_year(&title).is_none() {
            debug!(title = %title, "skipping undated conversion link");
            continue;
        }

        let Some(url) = resolve_link(base, href) else {
            continue;
        };

        if seen.insert(url.clone()) {
            entries.push(ListingEntry { title, url });
        }
    }

    entries
}

/// Concatenated, trimmed text of every `<span>` under `item`.
fn label_text(item: ElementRef<'_>) -> String {
    item.select(&LABEL_SEL)
        .flat_map(|span| span.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Nearest `<li>` ancestor.
fn enclosing_item(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "li")
}

/// Resolve an `href` against the download host.
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!(href, error = %e, "unresolvable download link");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.dgpa.gov.tw").unwrap()
    }

    #[test]
    fn year_from_roc_token() {
        assert_eq!(extract_year("114年中華民國政府行政機關辦公日曆表"), Some(2025));
        assert_eq!(extract_year("辦公日曆表(100年)"), Some(2011));
        assert_eq!(extract_year("中華民國政府行政機關辦公日曆表"), None);
        assert_eq!(extract_year("99年辦公日曆表"), None);
        assert_eq!(extract_year("１１４年"), None);
    }

    #[test]
    fn variant_markers() {
        assert!(is_google_variant("114年行政機關辦公日曆表(Google行事曆專用)"));
        assert!(is_google_variant("114年 google calendar"));
        assert!(!is_google_variant("114年中華民國政府行政機關辦公日曆表"));

        assert!(is_revised("114年中華民國政府行政機關辦公日曆表(修正)"));
        assert!(is_revised("113年辦公日曆表修訂版"));
        assert!(is_revised("112年辦公日曆表(更新)"));
        assert!(!is_revised("114年中華民國政府行政機關辦公日曆表"));
    }

    #[test]
    fn structured_rows_resolve_relative_links() {
        let html = r#"<div class="od-table"><ul>
            <li><span>114年中華民國政府行政機關辦公日曆表</span>
                <a href="/FileConversion?filename=dgpa/114.csv&amp;nid=1">CSV</a></li>
            <li><span>說明文件</span><a href="/about.pdf">PDF</a></li>
            <li><span></span><a href="/FileConversion?filename=x.csv">CSV</a></li>
            <li><span>113年辦公日曆表</span>
                <a href="https://cdn.example.org/files/113.csv">CSV</a></li>
        </ul></div>"#;
        let doc = Html::parse_document(html);

        let entries = extract_entries(&doc, &base());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "114年中華民國政府行政機關辦公日曆表");
        assert_eq!(
            entries[0].url,
            "https://www.dgpa.gov.tw/FileConversion?filename=dgpa/114.csv&nid=1"
        );
        assert_eq!(entries[1].url, "https://cdn.example.org/files/113.csv");
    }

    #[test]
    fn fallback_scans_conversion_links() {
        let html = r#"<html><body>
            <p><a href="/FileConversion?filename=115.csv">115年辦公日曆表</a></p>
            <ol><li><span>114年辦公日曆表(修正)</span>
                <a href="/FileConversion?filename=114r.csv"></a></li></ol>
            <p><a href="/FileConversion?filename=115.csv">115年辦公日曆表(重複)</a></p>
            <p><a href="/download/116.csv">116年辦公日曆表</a></p>
        </body></html>"#;
        let doc = Html::parse_document(html);

        let entries = extract_entries(&doc, &base());
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["115年辦公日曆表", "114年辦公日曆表(修正)"]);
    }
}
