//! Shared types, error model, and configuration for twcal.
//!
//! This crate is the foundation depended on by all other twcal crates.
//! It provides:
//! - [`CalendarError`], the unified error type
//! - Domain types ([`CalendarSource`], [`Holiday`], [`MonthlyDocument`], [`IndexEntry`])
//! - Configuration ([`AppConfig`], [`OutputProfile`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, DEFAULT_DATASET_URL, DEFAULT_LINK_BASE, DEFAULT_USER_AGENT,
    OutputConfig, OutputProfile, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{CalendarError, Result};
pub use types::{
    CalendarSource, Holiday, IndexDocument, IndexEntry, License, MonthHolidays, MonthlyDocument,
    ROC_YEAR_OFFSET, YearlyDocument,
};
