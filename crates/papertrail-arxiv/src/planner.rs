//! Expands search terms into query units that fit under the API result cap.
//!
//! arXiv stops paging at a fixed number of results per query. A term whose
//! probed count over the whole window exceeds that cap is split into
//! sub-windows (the configured list, or calendar years), each probed again;
//! empty sub-windows are dropped. With `split_months`, a sub-window still over
//! the cap is split once more by calendar month.

use std::fmt::Display;

use crate::query::build_query;
use crate::record::{DateWindow, QueryUnit};

/// A query unit with its search expression and probed result count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUnit {
    pub unit: QueryUnit,
    pub query: String,
    pub estimate: usize,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub units: Vec<PlannedUnit>,
    /// Terms or windows whose probe failed after retries
    pub skipped: Vec<QueryUnit>,
}

impl Plan {
    /// Sum of the estimates of all planned units
    pub fn total_estimate(&self) -> usize {
        self.units.iter().map(|u| u.estimate).sum()
    }
}

#[derive(Debug, Clone)]
pub struct TermPlanner {
    /// Pre-built category predicate, e.g. `(cat:cs.AI OR cat:cs.LG)`
    pub category_filter: String,
    pub per_query_cap: usize,
    /// Explicit sub-windows used instead of calendar years
    pub split_windows: Option<Vec<DateWindow>>,
    pub split_months: bool,
}

impl TermPlanner {
    pub fn new(category_filter: impl Into<String>, per_query_cap: usize) -> Self {
        Self {
            category_filter: category_filter.into(),
            per_query_cap,
            split_windows: None,
            split_months: true,
        }
    }

    pub fn query_for(&self, term: &str, window: &DateWindow) -> String {
        build_query(term, &self.category_filter, window)
    }

    /// Plan every term in order. `probe` maps a query to its result count.
    pub fn plan<E: Display>(
        &self,
        terms: &[String],
        window: DateWindow,
        mut probe: impl FnMut(&str) -> Result<usize, E>,
    ) -> Plan {
        let mut plan = Plan::default();
        for term in terms {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            self.plan_term(term, window, &mut probe, &mut plan);
        }
        log::info!(
            "Planned {} query units ({} skipped), ~{} results",
            plan.units.len(),
            plan.skipped.len(),
            plan.total_estimate()
        );
        plan
    }

    fn plan_term<E: Display>(
        &self,
        term: &str,
        window: DateWindow,
        probe: &mut impl FnMut(&str) -> Result<usize, E>,
        plan: &mut Plan,
    ) {
        let Some(whole) = self.probe_unit(term, window, probe, plan) else {
            return;
        };
        log::info!("{}: {} results", whole.unit, whole.estimate);
        if whole.estimate <= self.per_query_cap {
            plan.units.push(whole);
            return;
        }

        let subs = self.split(&window);
        if subs == [window] {
            // one year already: its count is the one just taken
            self.refine(term, whole, probe, plan);
            return;
        }
        for sub in subs {
            if let Some(part) = self.probe_unit(term, sub, probe, plan) {
                self.refine(term, part, probe, plan);
            }
        }
    }

    /// Keep a probed sub-window, dropping it when empty and splitting it by
    /// month when it is still over the cap.
    fn refine<E: Display>(
        &self,
        term: &str,
        part: PlannedUnit,
        probe: &mut impl FnMut(&str) -> Result<usize, E>,
        plan: &mut Plan,
    ) {
        if part.estimate == 0 {
            log::debug!("{}: no results, dropped", part.unit);
            return;
        }
        if part.estimate <= self.per_query_cap || !self.split_months {
            self.push_capped(part, plan);
            return;
        }

        let months = part.unit.window.months();
        if months == [part.unit.window] {
            self.push_capped(part, plan);
            return;
        }
        log::info!(
            "{}: {} results over cap {}, splitting by month",
            part.unit,
            part.estimate,
            self.per_query_cap
        );
        for month in months {
            match self.probe_unit(term, month, probe, plan) {
                Some(m) if m.estimate > 0 => self.push_capped(m, plan),
                Some(m) => log::debug!("{}: no results, dropped", m.unit),
                None => {}
            }
        }
    }

    fn push_capped(&self, unit: PlannedUnit, plan: &mut Plan) {
        if unit.estimate > self.per_query_cap {
            log::warn!(
                "{}: {} results exceed cap {}, only the first {} are reachable",
                unit.unit,
                unit.estimate,
                self.per_query_cap,
                self.per_query_cap
            );
        }
        plan.units.push(unit);
    }

    fn split(&self, window: &DateWindow) -> Vec<DateWindow> {
        match &self.split_windows {
            Some(list) => list.iter().filter_map(|w| w.intersect(window)).collect(),
            None => window.years(),
        }
    }

    fn probe_unit<E: Display>(
        &self,
        term: &str,
        window: DateWindow,
        probe: &mut impl FnMut(&str) -> Result<usize, E>,
        plan: &mut Plan,
    ) -> Option<PlannedUnit> {
        let unit = QueryUnit {
            term: term.to_string(),
            window,
        };
        let query = self.query_for(term, &window);
        match probe(&query) {
            Ok(estimate) => Some(PlannedUnit {
                unit,
                query,
                estimate,
            }),
            Err(e) => {
                log::warn!("{unit}: probe failed, skipping: {e}");
                plan.skipped.push(unit);
                None
            }
        }
    }
}
