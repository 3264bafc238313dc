//! Configuration loading from TOML files

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use papertrail_arxiv::config::default_checkpoint_path;
use papertrail_arxiv::{DEFAULT_BASE_URL, DateFilter, DateWindow};
use papertrail_core::BackoffPolicy;
use papertrail_enrich::{COL_ABSTRACT, COL_TITLE, OutputColumn};
use papertrail_snapshot::{CombineOptions, DiffOptions};
use serde::Deserialize;

/// Global configuration for papertrail
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub harvest: HarvestConfig,
    pub backoff: BackoffConfig,
    pub http: HttpConfig,
    pub enrich: EnrichConfig,
    pub diff: DiffConfig,
    pub combine: CombineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub terms: Vec<String>,
    pub categories: Vec<String>,
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    /// Today when unset
    #[serde(deserialize_with = "deserialize_opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_opt_date")]
    pub not_before: Option<NaiveDate>,
    /// End of the harvest window when unset
    #[serde(deserialize_with = "deserialize_opt_date")]
    pub not_after: Option<NaiveDate>,
    pub per_query_cap: usize,
    pub batch_size: usize,
    pub politeness_secs: u64,
    /// `data_<Mon>_<DD>.csv` when unset
    pub checkpoint: Option<PathBuf>,
    pub base_url: String,
    pub split_windows: Vec<SplitWindow>,
    pub split_months: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            categories: vec!["cs.AI".to_string(), "cs.LG".to_string()],
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end_date: None,
            not_before: None,
            not_after: None,
            per_query_cap: 1000,
            batch_size: 100,
            politeness_secs: 3,
            checkpoint: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            split_windows: Vec::new(),
            split_months: true,
        }
    }
}

/// One caller-supplied sub-window for over-cap terms
#[derive(Debug, Clone, Deserialize)]
pub struct SplitWindow {
    #[serde(deserialize_with = "deserialize_date")]
    pub start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub max_attempts: u32,
    pub initial_secs: u64,
    pub max_secs: u64,
    pub factor: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            initial_secs: 3,
            max_secs: 60,
            factor: 2,
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_secs(self.initial_secs),
            max_delay: Duration::from_secs(self.max_secs),
            factor: self.factor,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Seconds
    pub connect_timeout: u64,
    /// Seconds
    pub read_timeout: u64,
    /// Contact address appended to the User-Agent
    #[serde(deserialize_with = "deserialize_env_var")]
    pub contact: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            read_timeout: 30,
            contact: std::env::var("PAPERTRAIL_CONTACT").ok(),
        }
    }
}

impl HttpConfig {
    pub fn session_config(&self) -> papertrail_core::HttpConfig {
        let base = papertrail_core::HttpConfig::default();
        let user_agent = match &self.contact {
            Some(contact) => format!("{} (mailto:{contact})", base.user_agent),
            None => base.user_agent,
        };
        papertrail_core::HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            user_agent,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub url_column: String,
    pub title_column: String,
    pub abstract_column: String,
    pub workers: usize,
    pub flush_every: usize,
    pub resume: bool,
    /// Attempts per lookup
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        let d = papertrail_enrich::Config::default();
        Self {
            input: d.input,
            output: d.output,
            url_column: d.url_column,
            title_column: COL_TITLE.to_string(),
            abstract_column: COL_ABSTRACT.to_string(),
            workers: d.workers,
            flush_every: d.flush_every,
            resume: d.resume,
            retry_attempts: d.retry.max_attempts,
            retry_delay_secs: d.retry.initial_delay.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Holds `old_<company>.csv` and `new_<company>.csv`
    pub dir: PathBuf,
    pub companies: Vec<String>,
    pub key_column: String,
    pub drop_columns: Vec<String>,
    pub output_columns: Vec<String>,
    pub status_column: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        let d = DiffOptions::default();
        Self {
            dir: PathBuf::from("."),
            companies: vec![
                "Anthropic".to_string(),
                "OpenAI".to_string(),
                "GDM".to_string(),
            ],
            key_column: d.key_column,
            drop_columns: d.drop_columns,
            output_columns: d.output_columns,
            status_column: d.status_column,
        }
    }
}

impl DiffConfig {
    pub fn options(&self) -> DiffOptions {
        DiffOptions {
            key_column: self.key_column.clone(),
            drop_columns: self.drop_columns.clone(),
            output_columns: self.output_columns.clone(),
            status_column: self.status_column.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub key_column: String,
    pub drop_columns: Vec<String>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        let d = CombineOptions::default();
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("combined.csv"),
            key_column: d.key_column,
            drop_columns: d.drop_columns,
        }
    }
}

impl CombineConfig {
    pub fn options(&self) -> CombineOptions {
        CombineOptions {
            key_column: self.key_column.clone(),
            drop_columns: self.drop_columns.clone(),
        }
    }
}

/// Parse `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{s}': {e}"))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).map_err(serde::de::Error::custom)
}

fn deserialize_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| parse_date(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./papertrail.toml (current directory)
    /// 2. ~/.config/papertrail/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("papertrail.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "papertrail") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Runtime harvest settings, with `today` closing open-ended ranges
    pub fn harvest_config(&self, today: NaiveDate) -> Result<papertrail_arxiv::Config> {
        let h = &self.harvest;
        let end = h.end_date.unwrap_or(today);
        let window = DateWindow::new(h.start_date, end)
            .with_context(|| format!("start date {} is after end date {end}", h.start_date))?;

        let split_windows = if h.split_windows.is_empty() {
            None
        } else {
            let windows = h
                .split_windows
                .iter()
                .map(|w| {
                    DateWindow::new(w.start, w.end)
                        .with_context(|| format!("split window {} is after {}", w.start, w.end))
                })
                .collect::<Result<Vec<_>>>()?;
            Some(windows)
        };

        Ok(papertrail_arxiv::Config {
            terms: h.terms.clone(),
            categories: h.categories.clone(),
            window,
            date_filter: DateFilter {
                not_before: h.not_before,
                not_after: Some(h.not_after.unwrap_or(window.end)),
            },
            per_query_cap: h.per_query_cap,
            batch_size: h.batch_size,
            politeness_delay: Duration::from_secs(h.politeness_secs),
            backoff: self.backoff.policy(),
            base_url: h.base_url.clone(),
            checkpoint_path: h
                .checkpoint
                .clone()
                .unwrap_or_else(|| default_checkpoint_path(today)),
            split_windows,
            split_months: h.split_months,
        })
    }

    /// Runtime enrich settings; arXiv lookups share the harvest base URL
    pub fn enrich_config(&self) -> papertrail_enrich::Config {
        let e = &self.enrich;
        let delay = Duration::from_secs(e.retry_delay_secs);
        papertrail_enrich::Config {
            input: e.input.clone(),
            output: e.output.clone(),
            url_column: e.url_column.clone(),
            columns: vec![
                OutputColumn::new(&e.title_column).with_field(COL_TITLE),
                OutputColumn::new(&e.abstract_column).with_field(COL_ABSTRACT),
            ],
            workers: e.workers,
            flush_every: e.flush_every,
            resume: e.resume,
            arxiv_base_url: self.harvest.base_url.clone(),
            retry: BackoffPolicy {
                max_attempts: e.retry_attempts,
                initial_delay: delay,
                max_delay: delay,
                factor: 1,
            },
        }
    }
}
