//! CSV checkpoint file merged with whatever was on disk at open time

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use papertrail_core::{CsvSink, Table, cleanup_tmp_file};

use crate::harvest::{Checkpoint, HarvestState};
use crate::record::RawRecord;

pub const COL_TITLE: &str = "Title";
pub const COL_AUTHORS: &str = "Authors";
pub const COL_ABSTRACT: &str = "Abstract";
pub const COL_ID: &str = "arXiv ID";
pub const COL_PDF: &str = "PDF_Link";
pub const COL_SUBMITTED: &str = "Submitted";

pub const HEADER: [&str; 6] = [
    COL_TITLE,
    COL_AUTHORS,
    COL_ABSTRACT,
    COL_ID,
    COL_PDF,
    COL_SUBMITTED,
];

const AUTHOR_SEP: &str = ", ";

/// Checkpoint CSV at a fixed path.
///
/// Rows present when the file was opened are written back first, in file
/// order, then every in-memory record not among them sorted by id. Saving
/// the same state twice produces the same file.
#[derive(Debug)]
pub struct CsvCheckpoint {
    path: PathBuf,
    persisted: Vec<Vec<String>>,
    persisted_ids: HashSet<String>,
}

impl CsvCheckpoint {
    /// Open `path`, loading any existing rows into a fresh [`HarvestState`].
    ///
    /// Rows without a parseable `Submitted` date are kept verbatim and their
    /// ids marked seen, but they are not turned into records. Rows with a
    /// blank id are kept verbatim too. A file with rows but no `arXiv ID`
    /// column is refused, since saving over it would lose those rows.
    pub fn open(path: &Path) -> anyhow::Result<(Self, HarvestState)> {
        cleanup_tmp_file(path)
            .with_context(|| format!("Cannot clean tmp file for {}", path.display()))?;

        let mut checkpoint = Self {
            path: path.to_path_buf(),
            persisted: Vec::new(),
            persisted_ids: HashSet::new(),
        };
        let mut state = HarvestState::new();
        if !path.exists() {
            log::info!("Starting new checkpoint {}", path.display());
            return Ok((checkpoint, state));
        }

        let table = Table::read(path)
            .with_context(|| format!("Cannot read checkpoint {}", path.display()))?;
        if !table.is_empty() && table.column(COL_ID).is_none() {
            anyhow::bail!(
                "{}: checkpoint has {} rows but no '{COL_ID}' column (found: {})",
                path.display(),
                table.len(),
                table.headers().join(", ")
            );
        }
        let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
        let mut blank_ids = 0usize;
        for idx in 0..table.len() {
            let row = table.project(idx, &header);
            let id = row[3].trim().to_string();
            if id.is_empty() {
                blank_ids += 1;
                checkpoint.persisted.push(row);
                continue;
            }
            if !checkpoint.persisted_ids.insert(id.clone()) {
                continue;
            }
            match row_to_record(&row) {
                Some(record) => {
                    state.insert(record);
                }
                None => state.mark_seen(id),
            }
            checkpoint.persisted.push(row);
        }

        if blank_ids > 0 {
            log::warn!(
                "{}: {blank_ids} rows have no arXiv ID, kept as is",
                path.display()
            );
        }
        log::info!(
            "Loaded {} rows from {} ({} usable records)",
            checkpoint.persisted.len(),
            path.display(),
            state.len()
        );
        Ok((checkpoint, state))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows loaded at open time
    pub fn persisted_len(&self) -> usize {
        self.persisted.len()
    }
}

impl Checkpoint for CsvCheckpoint {
    fn save(&mut self, state: &HarvestState) -> anyhow::Result<()> {
        let ctx = || format!("Cannot write checkpoint {}", self.path.display());
        let mut sink = CsvSink::create(&self.path, HEADER).with_context(ctx)?;
        for row in &self.persisted {
            sink.write_row(row).with_context(ctx)?;
        }

        let mut fresh: Vec<&RawRecord> = state
            .records()
            .filter(|r| !self.persisted_ids.contains(&r.external_id))
            .collect();
        fresh.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        for record in fresh {
            sink.write_row(record_to_row(record)).with_context(ctx)?;
        }

        let rows = sink.finalize().with_context(ctx)?;
        log::debug!("Checkpoint {}: {rows} rows", self.path.display());
        Ok(())
    }
}

pub fn record_to_row(record: &RawRecord) -> [String; 6] {
    [
        record.title.clone(),
        record.authors.join(AUTHOR_SEP),
        record.abstract_text.clone(),
        record.external_id.clone(),
        record.pdf_link.clone(),
        record.published.format("%Y-%m-%d").to_string(),
    ]
}

/// Inverse of [`record_to_row`]; older files may carry a full timestamp in
/// `Submitted`, so only its date prefix is read
fn row_to_record(row: &[String]) -> Option<RawRecord> {
    let published =
        NaiveDate::parse_from_str(row[5].trim().get(..10)?, "%Y-%m-%d").ok()?;
    let authors = row[1]
        .split(AUTHOR_SEP)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    let external_id = row[3].trim().to_string();
    let pdf_link = if row[4].trim().is_empty() {
        RawRecord::pdf_link_for(&external_id)
    } else {
        row[4].clone()
    };
    Some(RawRecord {
        external_id,
        title: row[0].clone(),
        authors,
        abstract_text: row[2].clone(),
        published,
        pdf_link,
    })
}
