//! Publishing of monthly, yearly and index JSON documents.
//!
//! One [`Publisher`] covers both output profiles; the profile only decides
//! file naming, whether a yearly roll-up exists, and whether documents carry
//! the licence block. Every write replaces the previous file atomically.

mod layout;

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use twcal_shared::{
    CalendarError, IndexDocument, IndexEntry, License, MonthHolidays, MonthlyDocument,
    OutputProfile, Result, YearlyDocument,
};

pub use layout::INDEX_FILE;

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Writes calendar documents under an output root.
#[derive(Debug, Clone)]
pub struct Publisher {
    root: PathBuf,
    profile: OutputProfile,
}

/// Files produced by [`Publisher::write_source`].
#[derive(Debug, Default)]
pub struct SourceFiles {
    /// Non-empty months, January first.
    pub months: Vec<PathBuf>,
    /// Roll-up, absent for the legacy profile.
    pub yearly: Option<PathBuf>,
}

impl Publisher {
    pub fn new(root: impl Into<PathBuf>, profile: OutputProfile) -> Self {
        Self {
            root: root.into(),
            profile,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn profile(&self) -> OutputProfile {
        self.profile
    }

    /// Licence attached to monthly and yearly documents.
    fn license(&self) -> Option<License> {
        match self.profile {
            OutputProfile::Current => Some(License::open_government_data()),
            OutputProfile::Legacy => None,
        }
    }

    /// Persist one month. Months without holidays are skipped and return `None`.
    pub fn write_month(&self, doc: &MonthlyDocument) -> Result<Option<PathBuf>> {
        let mut staged = Staged::default();
        let path = self.stage_month(doc, &mut staged)?;
        staged.commit()?;
        Ok(path)
    }

    /// Persist every non-empty month; returns how many files were written.
    pub fn write_months(&self, docs: &[MonthlyDocument]) -> Result<usize> {
        let mut saved = 0;
        for doc in docs {
            if self.write_month(doc)?.is_some() {
                saved += 1;
            }
        }
        debug!(saved, empty = docs.len() - saved, "months written");
        Ok(saved)
    }

    /// Persist the yearly roll-up of `docs`.
    ///
    /// Returns `None` when `docs` is empty or the profile has no roll-up.
    pub fn write_year(&self, docs: &[MonthlyDocument]) -> Result<Option<PathBuf>> {
        let mut staged = Staged::default();
        let path = self.stage_year(docs, &mut staged)?;
        staged.commit()?;
        Ok(path)
    }

    /// Persist one source's months and roll-up as a unit.
    ///
    /// Every document is written to a temp file first; targets are only
    /// replaced once all of them succeeded. On failure the temp files are
    /// removed and the output root is left as it was.
    #[instrument(skip_all, fields(year = docs.first().map(|d| d.year)))]
    pub fn write_source(&self, docs: &[MonthlyDocument]) -> Result<SourceFiles> {
        let mut staged = Staged::default();

        match self.stage_source(docs, &mut staged) {
            Ok(files) => {
                staged.commit()?;
                info!(months = files.months.len(), yearly = files.yearly.is_some(), "source written");
                Ok(files)
            }
            Err(e) => {
                staged.discard();
                Err(e)
            }
        }
    }

    fn stage_source(&self, docs: &[MonthlyDocument], staged: &mut Staged) -> Result<SourceFiles> {
        let mut files = SourceFiles::default();
        for doc in docs {
            if let Some(path) = self.stage_month(doc, staged)? {
                files.months.push(path);
            }
        }
        files.yearly = self.stage_year(docs, staged)?;
        Ok(files)
    }

    fn stage_month(&self, doc: &MonthlyDocument, staged: &mut Staged) -> Result<Option<PathBuf>> {
        if doc.holidays.is_empty() {
            debug!(year = doc.year, month = doc.month, "skipping empty month");
            return Ok(None);
        }

        let mut doc = doc.clone();
        doc.license = self.license();

        let path = self
            .root
            .join(layout::month_file(self.profile, doc.year, doc.month));
        staged.add(&path, &doc)?;
        debug!(year = doc.year, month = doc.month, holidays = doc.holidays.len(), "staged month");
        Ok(Some(path))
    }

    fn stage_year(&self, docs: &[MonthlyDocument], staged: &mut Staged) -> Result<Option<PathBuf>> {
        let Some(yearly) = build_yearly(docs, self.license()) else {
            return Ok(None);
        };
        let Some(relative) = layout::year_file(self.profile, yearly.year) else {
            return Ok(None);
        };

        let path = self.root.join(relative);
        staged.add(&path, &yearly)?;
        debug!(year = yearly.year, "staged yearly roll-up");
        Ok(Some(path))
    }

    /// Scan the output root and write `index.json` listing every artifact.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn write_index(&self) -> Result<Vec<IndexEntry>> {
        std::fs::create_dir_all(&self.root).map_err(|e| CalendarError::io(&self.root, e))?;

        let entries = scan_artifacts(&self.root)?;
        let index = IndexDocument {
            available_calendars: entries.clone(),
            generated_at: Utc::now(),
            license: self.license().map(License::with_note),
        };

        let path = self.root.join(INDEX_FILE);
        let mut staged = Staged::default();
        staged.add(&path, &index)?;
        staged.commit()?;
        info!(entries = entries.len(), path = %path.display(), "generated index");
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Merge one year's monthly documents into a roll-up, keeping empty months.
pub fn build_yearly(docs: &[MonthlyDocument], license: Option<License>) -> Option<YearlyDocument> {
    let first = docs.first()?;
    Some(YearlyDocument {
        year: first.year,
        months: docs
            .iter()
            .map(|doc| MonthHolidays {
                month: doc.month,
                holidays: doc.holidays.clone(),
            })
            .collect(),
        generated_at: Utc::now(),
        license,
    })
}

/// Enumerate persisted artifacts under `root`, newest first.
///
/// Recognizes `YYYY/MM.json` and `YYYY/all.json` as well as flat
/// `YYYY-MM.json` files at the root. Within a year the roll-up comes first,
/// then months in descending order.
pub fn scan_artifacts(root: &Path) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::new();

    for item in read_dir(root)? {
        let name = item.file_name().to_string_lossy().to_string();
        let path = item.path();

        if path.is_dir() {
            let Some(year) = layout::parse_year_dir(&name) else {
                continue;
            };
            for file in read_dir(&path)? {
                let file_name = file.file_name().to_string_lossy().to_string();
                if !file.path().is_file() {
                    continue;
                }
                if file_name == layout::YEARLY_FILE {
                    entries.push(index_entry(year, None, format!("{name}/{file_name}")));
                } else if let Some(month) = layout::parse_month_file(&file_name) {
                    entries.push(index_entry(year, Some(month), format!("{name}/{file_name}")));
                }
            }
        } else if let Some((year, month)) = layout::parse_flat_month_file(&name) {
            entries.push(index_entry(year, Some(month), name));
        }
    }

    entries.sort_by_key(|e| (Reverse(e.year), !e.is_yearly, Reverse(e.month)));
    Ok(entries)
}

fn index_entry(year: i32, month: Option<u32>, file_path: String) -> IndexEntry {
    IndexEntry {
        year,
        month,
        url: format!("./{file_path}"),
        file_path,
        is_yearly: month.is_none(),
    }
}

fn read_dir(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    std::fs::read_dir(dir)
        .map_err(|e| CalendarError::io(dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| CalendarError::io(dir, e))
}

// ---------------------------------------------------------------------------
// Staged writes
// ---------------------------------------------------------------------------

/// JSON files written under dot-prefixed temp names, awaiting rename.
#[derive(Debug, Default)]
struct Staged {
    /// `(temp, target)` pairs in staging order.
    files: Vec<(PathBuf, PathBuf)>,
}

impl Staged {
    /// Serialize `data` as pretty JSON into a temp file beside `path`.
    fn add<T: Serialize>(&mut self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| CalendarError::validation(format!("JSON serialization failed: {e}")))?;

        let parent = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| CalendarError::io(parent, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp = parent.join(format!(".{file_name}.tmp"));

        std::fs::write(&temp, json).map_err(|e| CalendarError::io(&temp, e))?;
        self.files.push((temp, path.to_path_buf()));
        Ok(())
    }

    /// Rename every temp file onto its target.
    fn commit(self) -> Result<()> {
        for (temp, target) in &self.files {
            std::fs::rename(temp, target).map_err(|e| CalendarError::io(target, e))?;
            debug!(path = %target.display(), "wrote JSON file");
        }
        Ok(())
    }

    /// Remove temp files without touching any target.
    fn discard(self) {
        for (temp, _) in &self.files {
            if let Err(e) = std::fs::remove_file(temp) {
                warn!(path = %temp.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twcal_shared::Holiday;

    fn holiday(date: &str) -> Holiday {
        Holiday {
            date: date.into(),
            name: String::new(),
            is_holiday: true,
            is_weekend: true,
            is_special_holiday: false,
            description: String::new(),
        }
    }

    /// Twelve months of `year`, with holidays only in the given months.
    fn year_docs(year: i32, filled: &[u32]) -> Vec<MonthlyDocument> {
        (1..=12)
            .map(|month| MonthlyDocument {
                year,
                month,
                holidays: if filled.contains(&month) {
                    vec![holiday(&format!("{year}{month:02}01"))]
                } else {
                    vec![]
                },
                generated_at: Utc::now(),
                license: None,
            })
            .collect()
    }

    fn read_value(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn empty_months_are_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        let saved = publisher.write_months(&year_docs(2025, &[1, 4])).unwrap();
        assert_eq!(saved, 2);
        assert!(tmp.path().join("2025/01.json").exists());
        assert!(tmp.path().join("2025/04.json").exists());
        assert!(!tmp.path().join("2025/02.json").exists());
    }

    #[test]
    fn current_profile_attaches_license() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        let path = publisher.write_month(&year_docs(2025, &[1])[0]).unwrap().unwrap();
        let value = read_value(&path);
        assert_eq!(value["year"], 2025);
        assert_eq!(value["month"], 1);
        assert_eq!(value["license"]["url"], "https://data.gov.tw/license");
        assert!(value["license"].get("note").is_none());
        assert_eq!(value["holidays"][0]["date"], "20250101");
    }

    #[test]
    fn yearly_rollup_keeps_empty_months() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        let path = publisher.write_year(&year_docs(2025, &[3])).unwrap().unwrap();
        assert_eq!(path, tmp.path().join("2025/all.json"));

        let value = read_value(&path);
        let months = value["months"].as_array().unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0]["holidays"].as_array().unwrap().len(), 0);
        assert_eq!(months[2]["holidays"].as_array().unwrap().len(), 1);
        assert!(value["license"].is_object());
    }

    #[test]
    fn yearly_rollup_skipped_without_months() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);
        assert!(publisher.write_year(&[]).unwrap().is_none());
    }

    #[test]
    fn legacy_profile_is_flat_without_rollup_or_license() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Legacy);
        let docs = year_docs(2024, &[2]);

        publisher.write_months(&docs).unwrap();
        assert!(publisher.write_year(&docs).unwrap().is_none());

        let path = tmp.path().join("2024-02.json");
        assert!(path.exists());
        assert!(read_value(&path).get("license").is_none());
        assert!(!tmp.path().join("2024").exists());

        let entries = publisher.write_index().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_path, "2024-02.json");
        assert!(read_value(&tmp.path().join(INDEX_FILE)).get("license").is_none());
    }

    #[test]
    fn index_ordering_and_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        for (year, months) in [(2024, vec![1, 12]), (2025, vec![2, 10, 1])] {
            let docs = year_docs(year, &months);
            publisher.write_months(&docs).unwrap();
            publisher.write_year(&docs).unwrap();
        }
        std::fs::write(tmp.path().join("2025/notes.txt"), "x").unwrap();
        std::fs::create_dir_all(tmp.path().join("drafts")).unwrap();

        let entries = publisher.write_index().unwrap();
        let files: Vec<&str> = entries.iter().map(|e| e.file_path.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "2025/all.json",
                "2025/10.json",
                "2025/02.json",
                "2025/01.json",
                "2024/all.json",
                "2024/12.json",
                "2024/01.json",
            ]
        );
        assert!(entries[0].is_yearly);
        assert_eq!(entries[0].month, None);
        assert_eq!(entries[1].url, "./2025/10.json");

        let index = read_value(&tmp.path().join(INDEX_FILE));
        assert_eq!(index["availableCalendars"].as_array().unwrap().len(), 7);
        assert_eq!(index["availableCalendars"][0]["isYearly"], true);
        assert!(index["license"]["note"].is_string());
        assert!(index["generatedAt"].is_string());
    }

    #[test]
    fn rewrite_overwrites_and_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        let mut docs = year_docs(2025, &[1]);
        publisher.write_month(&docs[0]).unwrap();
        docs[0].holidays.push(holiday("20250102"));
        let path = publisher.write_month(&docs[0]).unwrap().unwrap();

        assert_eq!(read_value(&path)["holidays"].as_array().unwrap().len(), 2);
        for entry in std::fs::read_dir(tmp.path().join("2025")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }
    }

    #[test]
    fn source_is_written_as_a_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        let files = publisher.write_source(&year_docs(2025, &[1, 4])).unwrap();
        assert_eq!(files.months.len(), 2);
        assert_eq!(files.yearly, Some(tmp.path().join("2025/all.json")));
        assert!(tmp.path().join("2025/04.json").exists());
    }

    #[test]
    fn failed_source_leaves_no_partial_output() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path(), OutputProfile::Current);

        let old = year_docs(2025, &[1]);
        publisher.write_month(&old[0]).unwrap();
        let before = std::fs::read_to_string(tmp.path().join("2025/01.json")).unwrap();

        // A directory squatting on the roll-up's temp name makes staging fail
        // after the months were already staged.
        std::fs::create_dir_all(tmp.path().join("2025/.all.json.tmp")).unwrap();

        let mut docs = year_docs(2025, &[1, 6]);
        docs[0].holidays.push(holiday("20250102"));
        assert!(publisher.write_source(&docs).is_err());

        assert_eq!(
            std::fs::read_to_string(tmp.path().join("2025/01.json")).unwrap(),
            before
        );
        assert!(!tmp.path().join("2025/06.json").exists());
        assert!(!tmp.path().join("2025/all.json").exists());
        assert!(!tmp.path().join("2025/.01.json.tmp").exists());
        assert!(!tmp.path().join("2025/.06.json.tmp").exists());

        let entries = publisher.write_index().unwrap();
        let files: Vec<&str> = entries.iter().map(|e| e.file_path.as_str()).collect();
        assert_eq!(files, vec!["2025/01.json"]);
    }

    #[test]
    fn index_of_missing_root_is_created_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("public");
        let entries = Publisher::new(&root, OutputProfile::Current).write_index().unwrap();
        assert!(entries.is_empty());
        assert!(root.join(INDEX_FILE).exists());
    }
}
