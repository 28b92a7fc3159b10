//! Update pipeline for twcal.
//!
//! Ties the catalog, fetcher, decoder, normalizer and publisher together
//! into a single run over every advertised calendar year.

pub mod pipeline;

pub use pipeline::{
    ProgressReporter, SilentProgress, SourceFailure, UpdateConfig, UpdateResult, fetch_catalog,
    rebuild_index, run_update,
};
