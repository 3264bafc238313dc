//! Row-level enrichment steps
//!
//! A [`RowEnricher`] reads some cells of a row and returns values for the
//! output columns. URL lookups through an [`ExtractorRegistry`] are one such
//! step; a classifier or affiliation lookup over a remote model is another.

use crate::error::EnrichmentFailure;
use crate::extract::{Extracted, ExtractorRegistry};

/// Read-only view of one table row by header name
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> RowView<'a> {
    pub fn new(headers: &'a [String], cells: &'a [String]) -> Self {
        Self { headers, cells }
    }

    /// Trimmed cell under `column`; empty when the column is unknown
    pub fn get(&self, column: &str) -> &'a str {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.cells.get(i))
            .map_or("", |c| c.trim())
    }
}

/// One enrichment step, called from worker threads
pub trait RowEnricher: Send + Sync {
    /// Columns the input table must have
    fn input_columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn enrich(&self, row: &RowView<'_>) -> Result<Extracted, EnrichmentFailure>;
}

impl<F> RowEnricher for F
where
    F: Fn(&RowView<'_>) -> Result<Extracted, EnrichmentFailure> + Send + Sync,
{
    fn enrich(&self, row: &RowView<'_>) -> Result<Extracted, EnrichmentFailure> {
        self(row)
    }
}

/// Looks up the URL in `column` through a registry
pub struct ByUrl<'a> {
    registry: &'a ExtractorRegistry,
    column: String,
}

impl<'a> ByUrl<'a> {
    pub fn new(registry: &'a ExtractorRegistry, column: impl Into<String>) -> Self {
        Self {
            registry,
            column: column.into(),
        }
    }
}

impl RowEnricher for ByUrl<'_> {
    fn input_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn enrich(&self, row: &RowView<'_>) -> Result<Extracted, EnrichmentFailure> {
        self.registry.extract(row.get(&self.column))
    }
}
