//! Main runner for the arXiv harvest

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use papertrail_core::{HttpSession, ProgressContext, Sleeper, ThreadSleeper, fmt_num};

use crate::checkpoint::CsvCheckpoint;
use crate::client::{ArxivClient, SearchClient};
use crate::config::Config;
use crate::fetcher::BackoffFetcher;
use crate::harvest::{Checkpoint, HarvestLoop, HarvestReport, HarvestState};
use crate::planner::{Plan, TermPlanner};
use crate::query::category_filter;
use crate::record::QueryUnit;

/// Harvest execution summary
#[derive(Debug)]
pub struct Summary {
    pub units_planned: usize,
    pub units_incomplete: usize,
    pub skipped: Vec<QueryUnit>,
    pub probed_total: usize,
    pub fetched: usize,
    pub retrieved: usize,
    pub duplicates: usize,
    pub filtered_out: usize,
    pub fetch_calls: usize,
    pub exhausted_batches: usize,
    /// Records held in the checkpoint after the run
    pub total_records: usize,
    pub elapsed: Duration,
}

impl Summary {
    fn new(plan: &Plan, report: &HarvestReport, elapsed: Duration) -> Self {
        Self {
            units_planned: plan.units.len(),
            units_incomplete: report.units.iter().filter(|u| !u.complete).count(),
            skipped: plan.skipped.clone(),
            probed_total: report.probed_total,
            fetched: report.fetched,
            retrieved: report.retrieved,
            duplicates: report.duplicates,
            filtered_out: report.filtered_out,
            fetch_calls: report.fetch_calls,
            exhausted_batches: report.exhausted_batches,
            total_records: report.state.len(),
            elapsed,
        }
    }

    /// Label/value pairs for tabular display
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "Query units",
                format!(
                    "{} ({} incomplete, {} skipped)",
                    self.units_planned,
                    self.units_incomplete,
                    self.skipped.len()
                ),
            ),
            ("Total probed", fmt_num(self.probed_total)),
            ("Fetched", fmt_num(self.fetched)),
            ("New records", fmt_num(self.retrieved)),
            ("Duplicates skipped", fmt_num(self.duplicates)),
            ("Filtered out (date)", fmt_num(self.filtered_out)),
            (
                "Batches",
                format!("{} ({} exhausted)", self.fetch_calls, self.exhausted_batches),
            ),
            ("Records in checkpoint", fmt_num(self.total_records)),
            ("Time", format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]
    }

    /// Log summary (non-TTY mode)
    pub fn log(&self) {
        log::info!("=== arXiv Harvest Summary ===");
        for (label, value) in self.rows() {
            log::info!("{label}: {value}");
        }
        for unit in &self.skipped {
            log::warn!("Not harvested (probe failed): {unit}");
        }
    }
}

/// Run the harvest against the arXiv API
pub fn run(
    config: &Config,
    session: Arc<HttpSession>,
    progress: &ProgressContext,
) -> Result<Summary> {
    config.validate()?;
    let client = ArxivClient::new(session, config.base_url.clone());
    let (mut checkpoint, state) = CsvCheckpoint::open(&config.checkpoint_path)?;
    harvest_with(config, client, ThreadSleeper, state, &mut checkpoint, progress)
}

/// Plan and harvest with explicit collaborators
pub fn harvest_with<C, S, K>(
    config: &Config,
    client: C,
    sleeper: S,
    state: HarvestState,
    checkpoint: &mut K,
    progress: &ProgressContext,
) -> Result<Summary>
where
    C: SearchClient,
    S: Sleeper,
    K: Checkpoint,
{
    let start = Instant::now();
    log::info!(
        "Harvesting {} terms over {} (cap {}, batch {})",
        config.terms.len(),
        config.window,
        config.per_query_cap,
        config.batch_size
    );
    if !state.is_empty() {
        log::info!(
            "Resuming with {} records ({} ids seen)",
            fmt_num(state.len()),
            fmt_num(state.seen_count())
        );
    }

    let fetcher = BackoffFetcher::new(client, config.backoff.clone(), sleeper);

    let planner = TermPlanner {
        category_filter: category_filter(&config.categories),
        per_query_cap: config.per_query_cap,
        split_windows: config.split_windows.clone(),
        split_months: config.split_months,
    };
    let plan = {
        let pb = progress.stage_line("plan");
        let plan = planner.plan(&config.terms, config.window, |query| {
            pb.set_message(query.to_string());
            fetcher.probe(query)
        });
        pb.finish_and_clear();
        plan
    };

    let report = HarvestLoop::new(&fetcher, config.batch_size, config.politeness_delay)
        .with_cap(config.per_query_cap)
        .with_progress(progress)
        .run(&plan.units, state, &config.date_filter, checkpoint)
        .context("Harvest aborted")?;

    Ok(Summary::new(&plan, &report, start.elapsed()))
}
