//! Main runner for table enrichment

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use papertrail_arxiv::ArxivClient;
use papertrail_core::{HttpSession, ProgressContext, Table, WorkQueue, fmt_num};

use crate::config::Config;
use crate::error::EnrichmentFailure;
use crate::extract::{ArxivExtractor, Extracted, ExtractorRegistry};
use crate::pool::EnrichPool;
use crate::row::{ByUrl, RowEnricher, RowView};

/// Enrichment execution summary
#[derive(Debug)]
pub struct Summary {
    pub total_rows: usize,
    /// Rows already filled by an earlier run
    pub already_done: usize,
    pub enriched: usize,
    pub failed: usize,
    pub flushes: usize,
    pub elapsed: Duration,
}

impl Summary {
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Rows", fmt_num(self.total_rows)),
            ("Already done", fmt_num(self.already_done)),
            ("Enriched", fmt_num(self.enriched)),
            ("Failed", fmt_num(self.failed)),
            ("Flushes", fmt_num(self.flushes)),
            ("Time", format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]
    }

    pub fn log(&self) {
        log::info!("=== Enrichment Summary ===");
        for (label, value) in self.rows() {
            log::info!("{label}: {value}");
        }
    }
}

/// Registry with every extractor that ships with papertrail
pub fn default_registry(config: &Config, session: Arc<HttpSession>) -> ExtractorRegistry {
    let client = ArxivClient::new(session, config.arxiv_base_url.clone());
    let mut registry = ExtractorRegistry::new();
    registry.register("arxiv.org", ArxivExtractor::new(client, config.retry.clone()));
    registry
}

/// Enrich `config.input` with the built-in extractors
pub fn run(
    config: &Config,
    session: Arc<HttpSession>,
    progress: &ProgressContext,
) -> Result<Summary> {
    let registry = default_registry(config, session);
    enrich_with(config, &registry, progress)
}

/// Empty, or a sentinel left by a failed run
fn needs_fill(cell: Option<&str>) -> bool {
    let cell = cell.unwrap_or_default().trim();
    cell.is_empty() || EnrichmentFailure::is_sentinel(cell)
}

/// A row waiting for its step
struct RowJob {
    cells: Vec<String>,
    /// Positions in `Config::columns` this row gets written to
    fill: Vec<usize>,
}

/// Enrich by URL with an explicit registry
pub fn enrich_with(
    config: &Config,
    registry: &ExtractorRegistry,
    progress: &ProgressContext,
) -> Result<Summary> {
    log::debug!(
        "Extractors for: {}",
        registry.hosts().collect::<Vec<_>>().join(", ")
    );
    enrich_rows(config, &ByUrl::new(registry, &config.url_column), progress)
}

/// Run `enricher` over every row that still needs it.
///
/// With `resume`, only cells that are empty or hold a sentinel are written;
/// filled cells of the same row stay as they are. Without it every output
/// cell is rewritten.
pub fn enrich_rows<E: RowEnricher + ?Sized>(
    config: &Config,
    enricher: &E,
    progress: &ProgressContext,
) -> Result<Summary> {
    let start = Instant::now();
    if config.columns.is_empty() {
        anyhow::bail!("no output columns configured");
    }
    let source: &Path = if config.resume && config.output.exists() {
        log::info!("Resuming from {}", config.output.display());
        &config.output
    } else {
        &config.input
    };
    let mut table =
        Table::read(source).with_context(|| format!("Cannot read {}", source.display()))?;
    for column in enricher.input_columns() {
        if table.column(&column).is_none() {
            anyhow::bail!("{}: no '{column}' column", source.display());
        }
    }
    let out_cols: Vec<usize> = config
        .columns
        .iter()
        .map(|c| table.ensure_column(&c.name))
        .collect();
    let headers = table.headers().to_vec();

    let total_rows = table.len();
    let pending: Vec<(usize, RowJob)> = (0..total_rows)
        .filter_map(|i| {
            let fill: Vec<usize> = (0..out_cols.len())
                .filter(|&k| !config.resume || needs_fill(table.cell(i, out_cols[k])))
                .collect();
            (!fill.is_empty()).then(|| {
                let cells = table.rows()[i].clone();
                (i, RowJob { cells, fill })
            })
        })
        .collect();
    let queue = WorkQueue::from_indexed(pending);
    let already_done = total_rows - queue.total();
    log::info!(
        "Enriching {} of {} rows into {} with {} workers",
        fmt_num(queue.total()),
        fmt_num(total_rows),
        config
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.workers
    );

    let enriched = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let pool = EnrichPool::new(config.workers, config.flush_every)
        .with_progress(progress.count_bar("enrich", queue.total() as u64));

    let (_, stats) = pool.run(
        &queue,
        table,
        |_, job: &RowJob| {
            let row = RowView::new(&headers, &job.cells);
            (job.fill.clone(), enricher.enrich(&row))
        },
        |table, idx, (fill, result): (Vec<usize>, Result<Extracted, EnrichmentFailure>)| {
            match result {
                Ok(found) => {
                    for k in fill {
                        let column = &config.columns[k];
                        let value = found.get(&column.field).unwrap_or(column.placeholder.as_str());
                        table.set(idx, out_cols[k], value);
                    }
                    enriched.fetch_add(1, Ordering::Relaxed);
                }
                Err(failure) => {
                    log::warn!("Row {}: {failure}", idx + 1);
                    let sentinel = failure.sentinel();
                    for k in fill {
                        table.set(idx, out_cols[k], sentinel.clone());
                    }
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        },
        |table| {
            table
                .write(&config.output)
                .map(|_| ())
                .with_context(|| format!("Cannot write {}", config.output.display()))
        },
    )?;

    Ok(Summary {
        total_rows,
        already_done,
        enriched: enriched.into_inner(),
        failed: failed.into_inner(),
        flushes: stats.flushes,
        elapsed: start.elapsed(),
    })
}
