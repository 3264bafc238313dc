//! Enrichment configuration

use std::path::PathBuf;
use std::time::Duration;

use papertrail_arxiv::DEFAULT_BASE_URL;
use papertrail_core::BackoffPolicy;

use crate::extract::{COL_ABSTRACT, COL_TITLE};

/// An output column and the text written when a step finds no value for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub name: String,
    /// Key read from the step's [`Extracted`](crate::Extracted), usually `name`
    pub field: String,
    pub placeholder: String,
}

impl OutputColumn {
    /// Column read from the field of the same name, with the
    /// `<name> not found` placeholder
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            placeholder: format!("{name} not found"),
            name,
        }
    }

    /// Write the step's `field` under this column's own name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

/// Runtime configuration for one enrichment run
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    /// Written every `flush_every` rows and at the end
    pub output: PathBuf,
    pub url_column: String,
    /// Columns filled by the step, created when missing
    pub columns: Vec<OutputColumn>,
    pub workers: usize,
    pub flush_every: usize,
    /// Continue from `output` if it exists, skipping rows already filled
    pub resume: bool,
    pub arxiv_base_url: String,
    /// Retry budget per lookup
    pub retry: BackoffPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("papers.csv"),
            output: PathBuf::from("papers_enriched.csv"),
            url_column: "URL".to_string(),
            columns: vec![OutputColumn::new(COL_TITLE), OutputColumn::new(COL_ABSTRACT)],
            workers: 6,
            flush_every: 50,
            resume: true,
            arxiv_base_url: DEFAULT_BASE_URL.to_string(),
            retry: BackoffPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(1),
                factor: 1,
            },
        }
    }
}
