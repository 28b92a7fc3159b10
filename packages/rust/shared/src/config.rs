//! Application configuration for twcal.
//!
//! User config lives at `~/.twcal/twcal.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "twcal.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".twcal";

/// Dataset page on the government open data portal.
pub const DEFAULT_DATASET_URL: &str = "https://data.gov.tw/dataset/14718";

/// Host that relative download links on the listing page resolve against.
pub const DEFAULT_LINK_BASE: &str = "https://www.dgpa.gov.tw";

/// User-Agent sent with CSV downloads.
pub const DEFAULT_USER_AGENT: &str = "Taiwan-Calendar-Bot/1.0";

// ---------------------------------------------------------------------------
// Config structs (matching twcal.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where and how to read the dataset listing.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Where and how to publish JSON.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Listing page URL.
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,

    /// Base for relative download links.
    #[serde(default = "default_link_base")]
    pub link_base: String,

    /// User-Agent for CSV downloads.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dataset_url: default_dataset_url(),
            link_base: default_link_base(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_dataset_url() -> String {
    DEFAULT_DATASET_URL.into()
}
fn default_link_base() -> String {
    DEFAULT_LINK_BASE.into()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output root directory.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Layout profile.
    #[serde(default)]
    pub profile: OutputProfile,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            profile: OutputProfile::default(),
        }
    }
}

fn default_output_dir() -> String {
    "public".into()
}

/// Output layout profile.
///
/// `Current` writes `{year}/{MM}.json` plus `{year}/all.json` with licence
/// metadata. `Legacy` writes flat `{year}-{MM}.json` files, no roll-up and no
/// licence block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputProfile {
    #[default]
    Current,
    Legacy,
}

impl std::fmt::Display for OutputProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl std::str::FromStr for OutputProfile {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "legacy" => Ok(Self::Legacy),
            other => Err(CalendarError::config(format!(
                "unknown output profile '{other}': expected 'current' or 'legacy'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.twcal/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CalendarError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.twcal/twcal.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CalendarError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CalendarError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CalendarError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CalendarError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CalendarError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the configured URLs are absolute http(s) URLs.
pub fn validate(config: &AppConfig) -> Result<()> {
    for (key, value) in [
        ("catalog.dataset_url", &config.catalog.dataset_url),
        ("catalog.link_base", &config.catalog.link_base),
    ] {
        let parsed = url::Url::parse(value)
            .map_err(|e| CalendarError::config(format!("{key} '{value}' is not a URL: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(CalendarError::config(format!(
                "{key} '{value}' must use http or https"
            )));
        }
    }
    Ok(())
}
