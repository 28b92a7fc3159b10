//! Error types for twcal.
//!
//! Library crates use [`CalendarError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all calendar ingestion operations.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Raw transport failure reported by a fetcher.
    #[error("network error: {0}")]
    Network(String),

    /// The dataset listing page could not be retrieved.
    #[error("failed to fetch catalog {url}: {message}")]
    CatalogFetch { url: String, message: String },

    /// The listing parsed but advertised no dated calendar sources.
    #[error("no calendar sources found at {url}")]
    EmptyCatalog { url: String },

    /// A single source's CSV could not be downloaded.
    #[error("failed to fetch source {url}: {message}")]
    SourceFetch { url: String, message: String },

    /// Neither UTF-8 nor the legacy fallback could decode a payload.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// CSV or HTML structure could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (serialization, invalid values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CalendarError>;

impl CalendarError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only affects the source being processed.
    ///
    /// Catalog-level and configuration failures abort the run; everything
    /// else is skipped at the per-source loop boundary.
    pub fn is_source_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Config { .. } | Self::CatalogFetch { .. } | Self::EmptyCatalog { .. }
        )
    }
}
