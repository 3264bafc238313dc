//! Merge several harvest CSVs into one

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use papertrail_core::Table;

#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// First occurrence of each value wins
    pub key_column: String,
    pub drop_columns: Vec<String>,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            key_column: "arXiv ID".to_string(),
            drop_columns: vec!["Search Term".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineStats {
    pub files_read: usize,
    pub missing: Vec<PathBuf>,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl CombineStats {
    pub fn duplicates(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Concatenate `tables` in order under the union of their headers.
///
/// Rows whose key cell is empty are always kept.
pub fn combine_tables(tables: &[Table], opts: &CombineOptions) -> Table {
    let mut headers: Vec<String> = Vec::new();
    for t in tables {
        for h in t.headers() {
            if !opts.drop_columns.contains(h) && !headers.contains(h) {
                headers.push(h.clone());
            }
        }
    }

    let mut out = Table::new(headers.clone());
    let mut seen: HashSet<String> = HashSet::new();
    for t in tables {
        let key_col = t.column(&opts.key_column);
        for row in 0..t.len() {
            let key = key_col
                .and_then(|c| t.cell(row, c))
                .unwrap_or_default()
                .trim();
            if !key.is_empty() && !seen.insert(key.to_string()) {
                continue;
            }
            out.push_row(t.project(row, &headers));
        }
    }
    out
}

/// Combine the existing files among `inputs` into `output`.
///
/// Missing inputs are skipped with a warning; having none at all is an error.
pub fn combine_files(
    inputs: &[PathBuf],
    output: &Path,
    opts: &CombineOptions,
) -> Result<CombineStats> {
    let mut stats = CombineStats::default();
    let mut tables = Vec::with_capacity(inputs.len());
    for path in inputs {
        if !path.exists() {
            log::warn!("File {} not found, skipping", path.display());
            stats.missing.push(path.clone());
            continue;
        }
        let table =
            Table::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        log::debug!("{}: {} rows", path.display(), table.len());
        stats.rows_in += table.len();
        stats.files_read += 1;
        tables.push(table);
    }
    if tables.is_empty() {
        anyhow::bail!("none of the {} input files exist", inputs.len());
    }

    let combined = combine_tables(&tables, opts);
    stats.rows_out = combined.len();
    combined
        .write(output)
        .with_context(|| format!("Cannot write {}", output.display()))?;
    log::info!(
        "Combined {} files into {}: {} rows ({} duplicates dropped)",
        stats.files_read,
        output.display(),
        stats.rows_out,
        stats.duplicates()
    );
    Ok(stats)
}
