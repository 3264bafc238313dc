//! Harvest loop: paginate planned units, dedup, filter, checkpoint

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use papertrail_core::{ProgressContext, Sleeper, fmt_num};

use crate::client::SearchClient;
use crate::fetcher::{BackoffFetcher, BatchOutcome};
use crate::planner::PlannedUnit;
use crate::record::{DateWindow, RawRecord};

/// Accumulated records plus every id ever observed.
///
/// `seen_ids` is a superset of the keys of `records` and only grows.
#[derive(Debug, Clone, Default)]
pub struct HarvestState {
    records: HashMap<String, RawRecord>,
    seen_ids: HashSet<String>,
}

impl HarvestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record unless its id was already seen. Returns whether it was added.
    pub fn insert(&mut self, record: RawRecord) -> bool {
        if !self.seen_ids.insert(record.external_id.clone()) {
            return false;
        }
        self.records.insert(record.external_id.clone(), record);
        true
    }

    /// Remember an id without holding a record for it
    pub fn mark_seen(&mut self, id: impl Into<String>) {
        self.seen_ids.insert(id.into());
    }

    pub fn is_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&RawRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &RawRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen_ids.len()
    }
}

/// Durable storage for harvest progress
pub trait Checkpoint {
    fn save(&mut self, state: &HarvestState) -> anyhow::Result<()>;
}

impl<T: Checkpoint + ?Sized> Checkpoint for &mut T {
    fn save(&mut self, state: &HarvestState) -> anyhow::Result<()> {
        (**self).save(state)
    }
}

/// Inclusive bounds on a record's publication date; `None` is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub not_before: Option<NaiveDate>,
    pub not_after: Option<NaiveDate>,
}

impl DateFilter {
    /// Reject anything published after the end of `window`
    pub fn until_end_of(window: &DateWindow) -> Self {
        Self {
            not_before: None,
            not_after: Some(window.end),
        }
    }

    pub fn accepts(&self, date: NaiveDate) -> bool {
        self.not_before.map_or(true, |d| date >= d) && self.not_after.map_or(true, |d| date <= d)
    }
}

/// Outcome of one planned unit
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub label: String,
    pub estimate: usize,
    pub fetched: usize,
    pub added: usize,
    /// False when a batch was exhausted and the unit aborted
    pub complete: bool,
}

#[derive(Debug)]
pub struct HarvestReport {
    pub state: HarvestState,
    /// Sum of probed estimates over all units
    pub probed_total: usize,
    /// Records returned by the API across all batches
    pub fetched: usize,
    /// Records newly added to the state
    pub retrieved: usize,
    /// Distinct ids dropped because they were already seen
    pub duplicates: usize,
    pub filtered_out: usize,
    pub fetch_calls: usize,
    pub exhausted_batches: usize,
    pub units: Vec<UnitReport>,
}

/// Drives planned units through a [`BackoffFetcher`].
///
/// After every batch, successful or not, the state is checkpointed. The
/// politeness delay follows successful batches only; an exhausted batch
/// has already slept through its backoff.
pub struct HarvestLoop<'a, C, S> {
    fetcher: &'a BackoffFetcher<C, S>,
    batch_size: usize,
    politeness_delay: Duration,
    /// Results reachable by paging one query; later offsets are never requested
    cap: Option<usize>,
    progress: Option<&'a ProgressContext>,
}

impl<'a, C: SearchClient, S: Sleeper> HarvestLoop<'a, C, S> {
    pub fn new(
        fetcher: &'a BackoffFetcher<C, S>,
        batch_size: usize,
        politeness_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            batch_size: batch_size.max(1),
            politeness_delay,
            cap: None,
            progress: None,
        }
    }

    /// Stop paging a unit at `cap` even when its estimate is larger
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn with_progress(mut self, progress: &'a ProgressContext) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(
        &self,
        units: &[PlannedUnit],
        mut state: HarvestState,
        filter: &DateFilter,
        checkpoint: &mut impl Checkpoint,
    ) -> anyhow::Result<HarvestReport> {
        let mut duplicate_ids: HashSet<String> = HashSet::new();
        let mut report = HarvestReport {
            state: HarvestState::default(),
            probed_total: units.iter().map(|u| u.estimate).sum(),
            fetched: 0,
            retrieved: 0,
            duplicates: 0,
            filtered_out: 0,
            fetch_calls: 0,
            exhausted_batches: 0,
            units: Vec::with_capacity(units.len()),
        };

        for planned in units {
            let label = planned.unit.to_string();
            let estimate = planned.estimate;
            let reachable = self.cap.map_or(estimate, |cap| estimate.min(cap));
            let pb = self
                .progress
                .map(|p| p.count_bar(&label, reachable as u64));
            let mut unit = UnitReport {
                label,
                estimate,
                fetched: 0,
                added: 0,
                complete: true,
            };

            let mut offset = 0usize;
            while offset < reachable && unit.fetched < reachable {
                let limit = self.batch_size.min(reachable - offset);
                report.fetch_calls += 1;

                match self.fetcher.fetch_batch(&planned.query, offset, limit) {
                    BatchOutcome::Fetched(records) => {
                        unit.fetched += records.len();
                        for record in records {
                            if !filter.accepts(record.published) {
                                report.filtered_out += 1;
                                continue;
                            }
                            if state.is_seen(&record.external_id) {
                                duplicate_ids.insert(record.external_id);
                                continue;
                            }
                            state.insert(record);
                            unit.added += 1;
                        }
                        checkpoint
                            .save(&state)
                            .with_context(|| format!("{}: checkpoint failed", unit.label))?;
                        if let Some(pb) = &pb {
                            pb.set_position(unit.fetched as u64);
                        }
                        log::info!(
                            "{}: {}/{} fetched, {} new, {} total",
                            unit.label,
                            fmt_num(unit.fetched),
                            fmt_num(reachable),
                            unit.added,
                            fmt_num(state.len())
                        );
                        self.fetcher.sleeper().sleep(self.politeness_delay);
                        offset += limit;
                    }
                    BatchOutcome::Exhausted {
                        attempts,
                        last_error,
                    } => {
                        report.exhausted_batches += 1;
                        unit.complete = false;
                        log::warn!(
                            "{}: stopping at offset {offset} after {attempts} attempts ({last_error}), {} of ~{} fetched",
                            unit.label,
                            unit.fetched,
                            estimate
                        );
                        checkpoint
                            .save(&state)
                            .with_context(|| format!("{}: checkpoint failed", unit.label))?;
                        break;
                    }
                }
            }

            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            report.fetched += unit.fetched;
            report.retrieved += unit.added;
            report.units.push(unit);
        }

        checkpoint.save(&state).context("final checkpoint failed")?;
        report.duplicates = duplicate_ids.len();
        report.state = state;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(id: &str) -> RawRecord {
        RawRecord {
            external_id: id.into(),
            title: id.into(),
            authors: vec![],
            abstract_text: String::new(),
            published: d(2023, 1, 1),
            pdf_link: RawRecord::pdf_link_for(id),
        }
    }

    #[test]
    fn state_keeps_seen_superset() {
        let mut state = HarvestState::new();
        assert!(state.insert(rec("a")));
        assert!(!state.insert(rec("a")));
        state.mark_seen("b");
        assert!(!state.insert(rec("b")));
        assert_eq!(state.len(), 1);
        assert_eq!(state.seen_count(), 2);
        assert!(state.is_seen("a") && state.is_seen("b"));
        assert!(state.get("b").is_none());
    }

    #[test]
    fn date_filter_bounds_are_inclusive() {
        let filter = DateFilter {
            not_before: Some(d(2022, 1, 1)),
            not_after: Some(d(2024, 7, 31)),
        };
        assert!(filter.accepts(d(2022, 1, 1)));
        assert!(filter.accepts(d(2024, 7, 31)));
        assert!(!filter.accepts(d(2021, 12, 31)));
        assert!(!filter.accepts(d(2024, 8, 1)));
        assert!(DateFilter::default().accepts(d(1990, 1, 1)));
    }

    #[test]
    fn filter_defaults_to_window_end() {
        let window = DateWindow::new(d(2022, 1, 1), d(2022, 12, 31)).unwrap();
        let filter = DateFilter::until_end_of(&window);
        assert!(filter.accepts(d(2019, 1, 1)));
        assert!(!filter.accepts(d(2023, 1, 1)));
    }
}
