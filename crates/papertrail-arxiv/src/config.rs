//! arXiv harvest configuration

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use papertrail_core::BackoffPolicy;

use crate::client::DEFAULT_BASE_URL;
use crate::harvest::DateFilter;
use crate::record::DateWindow;

/// Runtime configuration for one harvest run
#[derive(Debug, Clone)]
pub struct Config {
    /// Human search terms, matched against titles
    pub terms: Vec<String>,
    /// arXiv categories OR-ed together; empty means no category filter
    pub categories: Vec<String>,
    pub window: DateWindow,
    /// Applied to every returned record on top of the query's date range
    pub date_filter: DateFilter,
    /// Results reachable through paging for one query
    pub per_query_cap: usize,
    pub batch_size: usize,
    /// Pause after every successful batch
    pub politeness_delay: Duration,
    pub backoff: BackoffPolicy,
    pub base_url: String,
    pub checkpoint_path: PathBuf,
    /// Sub-windows used instead of calendar years when a term is over the cap
    pub split_windows: Option<Vec<DateWindow>>,
    pub split_months: bool,
}

impl Default for Config {
    fn default() -> Self {
        let today = Local::now().date_naive();
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or(today);
        let window = DateWindow::new(start.min(today), today).unwrap_or(DateWindow {
            start: today,
            end: today,
        });
        Self {
            terms: Vec::new(),
            categories: vec!["cs.AI".to_string(), "cs.LG".to_string()],
            window,
            date_filter: DateFilter::until_end_of(&window),
            per_query_cap: 1000,
            batch_size: 100,
            politeness_delay: Duration::from_secs(3),
            backoff: BackoffPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            checkpoint_path: default_checkpoint_path(today),
            split_windows: None,
            split_months: true,
        }
    }
}

impl Config {
    /// Reject settings that would make the run meaningless
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.terms.iter().all(|t| t.trim().is_empty()) {
            anyhow::bail!("no search terms configured");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.per_query_cap == 0 {
            anyhow::bail!("per_query_cap must be at least 1");
        }
        if let (Some(lo), Some(hi)) = (self.date_filter.not_before, self.date_filter.not_after) {
            if lo > hi {
                anyhow::bail!("date filter is empty: {lo} is after {hi}");
            }
        }
        Ok(())
    }
}

/// `data_Jul_04.csv` for the given day
pub fn default_checkpoint_path(day: NaiveDate) -> PathBuf {
    PathBuf::from(format!("data_{}.csv", day.format("%b_%d")))
}
