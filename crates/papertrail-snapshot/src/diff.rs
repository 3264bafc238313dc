//! Compare two snapshots of a paper list by URL

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use papertrail_core::Table;

/// Where a row was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffStatus {
    /// Only in the new snapshot
    New,
    /// Only in the old snapshot
    Old,
    Both,
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "New",
            Self::Old => "Old",
            Self::Both => "Both",
        })
    }
}

#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub key_column: String,
    /// Removed from both snapshots before comparing
    pub drop_columns: Vec<String>,
    /// Output columns before the status column; empty keeps every column
    pub output_columns: Vec<String>,
    pub status_column: String,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            key_column: "URL".to_string(),
            drop_columns: vec!["Date".to_string()],
            output_columns: ["Company", "Title", "URL", "Safety_category", "Abstract"]
                .map(String::from)
                .to_vec(),
            status_column: "New paper?".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffCounts {
    pub new: usize,
    pub old: usize,
    pub both: usize,
}

impl DiffCounts {
    pub fn total(&self) -> usize {
        self.new + self.old + self.both
    }
}

/// Rows by key, in first-seen key order; a repeated key keeps its first
/// position but takes the later row's cells
struct Keyed<'a> {
    table: &'a Table,
    order: Vec<&'a str>,
    latest: HashMap<&'a str, usize>,
}

impl<'a> Keyed<'a> {
    fn new(table: &'a Table, key_column: &str, name: &str) -> Result<Self> {
        let col = table
            .column(key_column)
            .with_context(|| format!("{name} snapshot has no '{key_column}' column"))?;
        let mut order = Vec::new();
        let mut latest = HashMap::new();
        for row in 0..table.len() {
            let key = table.cell(row, col).unwrap_or_default();
            if latest.insert(key, row).is_none() {
                order.push(key);
            }
        }
        Ok(Self {
            table,
            order,
            latest,
        })
    }
}

/// Classify every key of `old` and `new`.
///
/// Output rows follow the new snapshot's order, then old-only rows in the
/// old snapshot's order. A row present in both is taken from `new`.
pub fn diff_tables(old: &Table, new: &Table, opts: &DiffOptions) -> Result<(Table, DiffCounts)> {
    let mut old = old.clone();
    let mut new = new.clone();
    for col in &opts.drop_columns {
        old.drop_column(col);
        new.drop_column(col);
    }
    let old_keyed = Keyed::new(&old, &opts.key_column, "old")?;
    let new_keyed = Keyed::new(&new, &opts.key_column, "new")?;

    let mut columns: Vec<String> = if opts.output_columns.is_empty() {
        let mut cols = new.headers().to_vec();
        for h in old.headers() {
            if !cols.contains(h) {
                cols.push(h.clone());
            }
        }
        cols
    } else {
        opts.output_columns.clone()
    };
    columns.retain(|c| c != &opts.status_column);

    let mut header = columns.clone();
    header.push(opts.status_column.clone());
    let mut out = Table::new(header);
    let mut counts = DiffCounts::default();

    for key in &new_keyed.order {
        let status = if old_keyed.latest.contains_key(key) {
            counts.both += 1;
            DiffStatus::Both
        } else {
            counts.new += 1;
            DiffStatus::New
        };
        let mut row = new_keyed.table.project(new_keyed.latest[key], &columns);
        row.push(status.to_string());
        out.push_row(row);
    }
    for key in &old_keyed.order {
        if new_keyed.latest.contains_key(key) {
            continue;
        }
        counts.old += 1;
        let mut row = old_keyed.table.project(old_keyed.latest[key], &columns);
        row.push(DiffStatus::Old.to_string());
        out.push_row(row);
    }
    Ok((out, counts))
}

/// Diff two CSV files and write the comparison to `output`
pub fn diff_files(
    old: &Path,
    new: &Path,
    output: &Path,
    opts: &DiffOptions,
) -> Result<DiffCounts> {
    let old_table =
        Table::read(old).with_context(|| format!("Cannot read old snapshot {}", old.display()))?;
    let new_table =
        Table::read(new).with_context(|| format!("Cannot read new snapshot {}", new.display()))?;
    let (table, counts) = diff_tables(&old_table, &new_table, opts)
        .with_context(|| format!("{} vs {}", old.display(), new.display()))?;
    table
        .write(output)
        .with_context(|| format!("Cannot write {}", output.display()))?;
    log::info!(
        "{}: {} new, {} old, {} both",
        output.display(),
        counts.new,
        counts.old,
        counts.both
    );
    Ok(counts)
}

/// `old_<name>.csv`, `new_<name>.csv` and `comparison_<name>.csv` in `dir`
pub fn snapshot_paths(dir: &Path, name: &str) -> (PathBuf, PathBuf, PathBuf) {
    (
        dir.join(format!("old_{name}.csv")),
        dir.join(format!("new_{name}.csv")),
        dir.join(format!("comparison_{name}.csv")),
    )
}
