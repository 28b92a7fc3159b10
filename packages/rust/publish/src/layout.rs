//! Artifact naming for both output profiles.
//!
//! ```text
//! current                     legacy
//! <root>/index.json           <root>/index.json
//! <root>/2025/all.json        <root>/2025-01.json
//! <root>/2025/01.json         <root>/2025-02.json
//! ```

use std::sync::LazyLock;

use regex::Regex;

use twcal_shared::OutputProfile;

/// Roll-up file name inside a year directory.
pub(crate) const YEARLY_FILE: &str = "all.json";

/// Index file name at the output root.
pub const INDEX_FILE: &str = "index.json";

static YEAR_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("year dir regex"));

static MONTH_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{2})\.json$").expect("month file regex"));

static FLAT_MONTH_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})\.json$").expect("flat month regex"));

/// Relative, `/`-separated path of a monthly artifact.
pub(crate) fn month_file(profile: OutputProfile, year: i32, month: u32) -> String {
    match profile {
        OutputProfile::Current => format!("{year}/{month:02}.json"),
        OutputProfile::Legacy => format!("{year}-{month:02}.json"),
    }
}

/// Relative path of the yearly roll-up, if the profile has one.
pub(crate) fn year_file(profile: OutputProfile, year: i32) -> Option<String> {
    match profile {
        OutputProfile::Current => Some(format!("{year}/{YEARLY_FILE}")),
        OutputProfile::Legacy => None,
    }
}

/// Year of a `YYYY` directory name.
pub(crate) fn parse_year_dir(name: &str) -> Option<i32> {
    YEAR_DIR_RE.is_match(name).then(|| name.parse().ok()).flatten()
}

/// Month of an `MM.json` file name inside a year directory.
pub(crate) fn parse_month_file(name: &str) -> Option<u32> {
    let caps = MONTH_FILE_RE.captures(name)?;
    valid_month(caps[1].parse().ok()?)
}

/// Year and month of a flat `YYYY-MM.json` file name.
pub(crate) fn parse_flat_month_file(name: &str) -> Option<(i32, u32)> {
    let caps = FLAT_MONTH_FILE_RE.captures(name)?;
    let year = caps[1].parse().ok()?;
    let month = valid_month(caps[2].parse().ok()?)?;
    Some((year, month))
}

fn valid_month(month: u32) -> Option<u32> {
    (1..=12).contains(&month).then_some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_per_profile() {
        assert_eq!(month_file(OutputProfile::Current, 2025, 3), "2025/03.json");
        assert_eq!(month_file(OutputProfile::Legacy, 2025, 11), "2025-11.json");
        assert_eq!(year_file(OutputProfile::Current, 2025).as_deref(), Some("2025/all.json"));
        assert_eq!(year_file(OutputProfile::Legacy, 2025), None);
    }

    #[test]
    fn recognizes_artifact_names() {
        assert_eq!(parse_year_dir("2025"), Some(2025));
        assert_eq!(parse_year_dir("25"), None);
        assert_eq!(parse_year_dir("2025a"), None);

        assert_eq!(parse_month_file("01.json"), Some(1));
        assert_eq!(parse_month_file("12.json"), Some(12));
        assert_eq!(parse_month_file("13.json"), None);
        assert_eq!(parse_month_file("00.json"), None);
        assert_eq!(parse_month_file("all.json"), None);
        assert_eq!(parse_month_file(".01.json.tmp"), None);

        assert_eq!(parse_flat_month_file("2024-02.json"), Some((2024, 2)));
        assert_eq!(parse_flat_month_file("2024-2.json"), None);
        assert_eq!(parse_flat_month_file("index.json"), None);
    }
}
