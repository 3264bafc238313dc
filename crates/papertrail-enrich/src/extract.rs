//! Per-host extractors for paper metadata

use papertrail_arxiv::ArxivClient;
use papertrail_core::{BackoffPolicy, Sleeper, ThreadSleeper, retry_with_backoff};
use url::Url;

use crate::error::EnrichmentFailure;

pub const COL_TITLE: &str = "Title";
pub const COL_ABSTRACT: &str = "Abstract";

/// Values a step found, keyed by output column name.
///
/// A configured column that is absent here, or present as `None`, gets its
/// placeholder. Columns nobody configured are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    fields: Vec<(String, Option<String>)>,
}

impl Extracted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Set `column`, replacing an earlier value for it
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn fields(&self) -> &[(String, Option<String>)] {
        &self.fields
    }
}

/// Fetches metadata for URLs of one site. Called from worker threads.
pub trait Extractor: Send + Sync {
    fn extract(&self, url: &Url) -> Result<Extracted, EnrichmentFailure>;
}

/// Extractors keyed by host.
///
/// A key matches its exact host and any subdomain (`arxiv.org` matches
/// `export.arxiv.org`). The first registered match wins.
#[derive(Default)]
pub struct ExtractorRegistry {
    entries: Vec<(String, Box<dyn Extractor>)>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, host: &str, extractor: impl Extractor + 'static) -> &mut Self {
        self.entries
            .push((host.trim().to_ascii_lowercase(), Box::new(extractor)));
        self
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn find(&self, url: &Url) -> Option<&dyn Extractor> {
        let host = url.host_str()?.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| host_matches(&host, key))
            .map(|(_, e)| e.as_ref())
    }

    /// Parse `raw`, pick an extractor and run it
    pub fn extract(&self, raw: &str) -> Result<Extracted, EnrichmentFailure> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EnrichmentFailure::new("URL", "empty"));
        }
        let url = Url::parse(raw).map_err(|e| EnrichmentFailure::new("URL", e))?;
        let extractor = self.find(&url).ok_or_else(|| {
            EnrichmentFailure::new(
                "lookup",
                format!("no extractor for host {}", url.host_str().unwrap_or("?")),
            )
        })?;
        extractor.extract(&url)
    }
}

fn host_matches(host: &str, key: &str) -> bool {
    host == key
        || host
            .strip_suffix(key)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// arXiv id from an abstract or PDF link.
///
/// `https://arxiv.org/abs/2401.01234v2` → `2401.01234v2`,
/// `https://arxiv.org/pdf/hep-th/9901001.pdf` → `hep-th/9901001`.
pub fn arxiv_id_from_url(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let rest = match segments.iter().position(|s| matches!(*s, "abs" | "pdf")) {
        Some(pos) => &segments[pos + 1..],
        None => &segments[segments.len().saturating_sub(1)..],
    };
    let id = rest.join("/");
    let id = id.strip_suffix(".pdf").unwrap_or(&id).to_string();
    (!id.is_empty()).then_some(id)
}

/// Title and abstract through the arXiv API `id_list` lookup
pub struct ArxivExtractor<S = ThreadSleeper> {
    client: ArxivClient,
    policy: BackoffPolicy,
    sleeper: S,
}

impl ArxivExtractor {
    pub fn new(client: ArxivClient, policy: BackoffPolicy) -> Self {
        Self::with_sleeper(client, policy, ThreadSleeper)
    }
}

impl<S: Sleeper> ArxivExtractor<S> {
    pub fn with_sleeper(client: ArxivClient, policy: BackoffPolicy, sleeper: S) -> Self {
        Self {
            client,
            policy,
            sleeper,
        }
    }
}

impl<S: Sleeper + Send + Sync> Extractor for ArxivExtractor<S> {
    fn extract(&self, url: &Url) -> Result<Extracted, EnrichmentFailure> {
        let id = arxiv_id_from_url(url)
            .ok_or_else(|| EnrichmentFailure::new("URL", format!("no arXiv id in {url}")))?;
        let record = retry_with_backoff(&format!("arXiv {id}"), &self.policy, &self.sleeper, |_| {
            self.client.fetch_by_id(&id)
        })
        .map_err(|e| EnrichmentFailure::new("arXiv lookup", e.last_error))?
        .ok_or_else(|| EnrichmentFailure::new("arXiv lookup", format!("no entry for {id}")))?;

        Ok(Extracted::new()
            .with(COL_TITLE, Some(record.title).filter(|t| !t.is_empty()))
            .with(
                COL_ABSTRACT,
                Some(record.abstract_text).filter(|a| !a.is_empty()),
            ))
    }
}
