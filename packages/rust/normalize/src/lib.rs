//! Payload decoding and CSV-to-holiday normalization.
//!
//! A decoded calendar CSV has one row per day:
//! `西元日期,星期,是否放假,備註` (date, weekday, holiday flag, note).
//! [`normalize`] classifies each row and groups the results into twelve
//! [`MonthlyDocument`]s.

pub mod decode;

use chrono::{Datelike, NaiveDate, Utc, Weekday};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, instrument};

use twcal_shared::{CalendarError, CalendarSource, Holiday, MonthlyDocument, Result};

pub use decode::{FixedDecoder, SniffingDecoder, TextDecoder};

/// Accepted header spellings, in priority order.
const DATE_HEADERS: &[&str] = &["西元日期", "日期", "date", "Date"];
const WEEKDAY_HEADERS: &[&str] = &["星期", "weekday", "Weekday"];
const HOLIDAY_HEADERS: &[&str] = &["是否放假", "isHoliday", "IsHoliday"];
const DESCRIPTION_HEADERS: &[&str] = &["備註", "description", "Description"];

/// Holiday flag value meaning "day off". Other codes are working days.
const DAY_OFF_FLAG: &str = "2";

/// Number of leading rows whose skips are logged individually.
const LOGGED_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Column indices for each logical field, in header-priority order.
#[derive(Debug, Default)]
struct Columns {
    date: Vec<usize>,
    weekday: Vec<usize>,
    holiday: Vec<usize>,
    description: Vec<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Self {
        let positions = |names: &[&str]| -> Vec<usize> {
            names
                .iter()
                .filter_map(|name| headers.iter().position(|h| h == *name))
                .collect()
        };

        Self {
            date: positions(DATE_HEADERS),
            weekday: positions(WEEKDAY_HEADERS),
            holiday: positions(HOLIDAY_HEADERS),
            description: positions(DESCRIPTION_HEADERS),
        }
    }
}

/// First non-empty value among `columns`.
fn field<'r>(record: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|&i| record.get(i))
        .find(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// One CSV row, with each field already resolved from its header aliases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDay<'a> {
    pub date: Option<&'a str>,
    pub weekday: Option<&'a str>,
    pub holiday_flag: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Parse `YYYYMMDD` or `YYYY/MM/DD` into a calendar date.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();

    let (year, month, day) = if token.contains('/') {
        let mut parts = token.split('/');
        let (y, m, d) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some()
            || y.len() != 4
            || !(1..=2).contains(&m.len())
            || !(1..=2).contains(&d.len())
        {
            return None;
        }
        (y, m, d)
    } else if token.len() == 8 {
        (token.get(0..4)?, token.get(4..6)?, token.get(6..8)?)
    } else {
        return None;
    };

    if ![year, month, day]
        .iter()
        .all(|part| part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Saturday or Sunday, from the weekday column when present, else from the date.
pub fn is_weekend(date: NaiveDate, weekday: Option<&str>) -> bool {
    match weekday.map(str::trim).filter(|w| !w.is_empty()) {
        Some(w) => w == "六" || w == "日",
        None => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
    }
}

/// Classify a row. Returns the month it belongs to and the holiday record,
/// or `None` when the row has no usable date.
pub fn classify(raw: RawDay<'_>) -> Option<(u32, Holiday)> {
    let date = parse_date(raw.date?)?;

    let description = raw.description.unwrap_or_default().to_string();
    let is_holiday = raw.holiday_flag.unwrap_or("0").trim() == DAY_OFF_FLAG;
    let is_weekend = is_weekend(date, raw.weekday);
    let is_special_holiday = is_holiday && (!description.trim().is_empty() || !is_weekend);

    let holiday = Holiday {
        date: date.format("%Y%m%d").to_string(),
        name: description.clone(),
        is_holiday,
        is_weekend,
        is_special_holiday,
        description,
    };

    Some((date.month(), holiday))
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Parse decoded CSV text into twelve monthly documents (January first).
///
/// Rows without a recognizable date are dropped. Months without rows get an
/// empty holiday list. Documents carry no licence; publishing adds it.
#[instrument(skip(csv_text, source), fields(year = source.year, len = csv_text.len()))]
pub fn normalize(csv_text: &str, source: &CalendarSource) -> Result<Vec<MonthlyDocument>> {
    let csv_text = csv_text.strip_prefix('\u{FEFF}').unwrap_or(csv_text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CalendarError::parse(format!("{}: unreadable CSV header: {e}", source.title)))?
        .clone();
    let columns = Columns::resolve(&headers);
    debug!(?headers, "CSV columns");

    let mut months: [Vec<Holiday>; 12] = Default::default();
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                skipped += 1;
                debug!(index, error = %e, "skipping unreadable row");
                continue;
            }
        };

        let raw = RawDay {
            date: field(&record, &columns.date),
            weekday: field(&record, &columns.weekday),
            holiday_flag: field(&record, &columns.holiday),
            description: field(&record, &columns.description),
        };

        match classify(raw) {
            Some((month, holiday)) => {
                months[(month - 1) as usize].push(holiday);
                processed += 1;
            }
            None => {
                skipped += 1;
                if index < LOGGED_ROWS {
                    debug!(index, date = ?raw.date, "skipping row without a usable date");
                }
            }
        }
    }

    debug!(processed, skipped, "CSV normalized");

    let generated_at = Utc::now();
    Ok(months
        .into_iter()
        .zip(1u32..)
        .map(|(holidays, month)| MonthlyDocument {
            year: source.year,
            month,
            holidays,
            generated_at,
            license: None,
        })
        .collect())
}
