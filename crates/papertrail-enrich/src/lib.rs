//! Paper table enrichment
//!
//! Fills output columns of a CSV of papers by running one step per row,
//! over a bounded worker pool that writes the table back periodically.
//! The built-in step looks up titles and abstracts by URL with a per-host
//! extractor; any [`RowEnricher`] can take its place.

pub mod config;
pub mod error;
pub mod extract;
pub mod pool;
pub mod row;
mod runner;

pub use config::{Config, OutputColumn};
pub use error::EnrichmentFailure;
pub use extract::{
    ArxivExtractor, COL_ABSTRACT, COL_TITLE, Extracted, Extractor, ExtractorRegistry,
};
pub use pool::{EnrichPool, PoolStats};
pub use row::{ByUrl, RowEnricher, RowView};
pub use runner::{Summary, default_registry, enrich_rows, enrich_with, run};
