//! Core domain types for the holiday calendar pipeline.
//!
//! Field names on the wire are camelCase; consumers of the published JSON
//! rely on them staying stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Offset between a Taiwanese (ROC) year and the Gregorian year.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// Licence name attached to published documents.
pub const LICENSE_NAME: &str = "政府資料開放授權條款";

/// Canonical licence URL.
pub const LICENSE_URL: &str = "https://data.gov.tw/license";

/// Attribution string required by the licence.
pub const LICENSE_ATTRIBUTION: &str = "資料來源：行政院人事行政總處";

/// Long-form licence note, only carried by `index.json`.
pub const LICENSE_NOTE: &str = "此開放資料依政府資料開放授權條款 (Open Government Data License) 進行公眾釋出，使用者於遵守本條款各項規定之前提下，得利用之。";

// ---------------------------------------------------------------------------
// CalendarSource
// ---------------------------------------------------------------------------

/// One dataset entry advertised on the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSource {
    /// Gregorian year (ROC year + 1911).
    pub year: i32,
    /// Label text as shown on the listing page.
    pub title: String,
    /// Absolute download URL.
    pub url: String,
    /// Unofficial Google Calendar mirror.
    pub is_google_variant: bool,
    /// Title carries a corrected/revised/updated marker.
    pub is_revised: bool,
}

// ---------------------------------------------------------------------------
// Holiday
// ---------------------------------------------------------------------------

/// Classification of a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    /// `YYYYMMDD`, always 8 characters.
    pub date: String,
    /// Same as `description`.
    pub name: String,
    /// Day off.
    pub is_holiday: bool,
    /// Saturday or Sunday.
    pub is_weekend: bool,
    /// Day off that is not an unremarked ordinary weekend.
    pub is_special_holiday: bool,
    /// Free-text note from the source, may be empty.
    pub description: String,
}

// ---------------------------------------------------------------------------
// License
// ---------------------------------------------------------------------------

/// Attribution block attached to published documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    pub url: String,
    pub attribution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl License {
    /// The Open Government Data licence block used on monthly and yearly documents.
    pub fn open_government_data() -> Self {
        Self {
            name: LICENSE_NAME.into(),
            url: LICENSE_URL.into(),
            attribution: LICENSE_ATTRIBUTION.into(),
            note: None,
        }
    }

    /// Same licence with the long-form note, used by the index.
    pub fn with_note(mut self) -> Self {
        self.note = Some(LICENSE_NOTE.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Holidays of one month of one year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDocument {
    pub year: i32,
    /// 1..=12.
    pub month: u32,
    /// Source order, not date-sorted.
    pub holidays: Vec<Holiday>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// One month inside a [`YearlyDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthHolidays {
    pub month: u32,
    pub holidays: Vec<Holiday>,
}

/// Roll-up of all twelve months of one year (`all.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyDocument {
    pub year: i32,
    pub months: Vec<MonthHolidays>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Descriptor of one persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub year: i32,
    /// `None` for yearly roll-ups.
    pub month: Option<u32>,
    /// Path relative to the output root, `/`-separated.
    #[serde(rename = "file")]
    pub file_path: String,
    /// `./` + `file`.
    pub url: String,
    pub is_yearly: bool,
}

/// Root structure of `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub available_calendars: Vec<IndexEntry>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holiday_serializes_camel_case() {
        let holiday = Holiday {
            date: "20250101".into(),
            name: "開國紀念日".into(),
            is_holiday: true,
            is_weekend: false,
            is_special_holiday: true,
            description: "開國紀念日".into(),
        };

        let value = serde_json::to_value(&holiday).expect("serialize");
        assert_eq!(value["date"], "20250101");
        assert_eq!(value["isHoliday"], true);
        assert_eq!(value["isWeekend"], false);
        assert_eq!(value["isSpecialHoliday"], true);
        assert_eq!(value["description"], "開國紀念日");
    }

    #[test]
    fn monthly_document_omits_missing_license() {
        let doc = MonthlyDocument {
            year: 2025,
            month: 1,
            holidays: vec![],
            generated_at: Utc::now(),
            license: None,
        };

        let json = serde_json::to_string(&doc).expect("serialize");
        assert!(json.contains("\"generatedAt\""));
        assert!(!json.contains("license"));
    }

    #[test]
    fn license_note_only_when_requested() {
        let plain = serde_json::to_value(License::open_government_data()).expect("serialize");
        assert!(plain.get("note").is_none());
        assert_eq!(plain["url"], LICENSE_URL);

        let noted = serde_json::to_value(License::open_government_data().with_note())
            .expect("serialize");
        assert_eq!(noted["note"], LICENSE_NOTE);
    }

    #[test]
    fn index_entry_wire_names() {
        let entry = IndexEntry {
            year: 2025,
            month: None,
            file_path: "2025/all.json".into(),
            url: "./2025/all.json".into(),
            is_yearly: true,
        };

        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["file"], "2025/all.json");
        assert!(value["month"].is_null());
        assert_eq!(value["isYearly"], true);

        let parsed: IndexEntry = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, entry);
    }
}
