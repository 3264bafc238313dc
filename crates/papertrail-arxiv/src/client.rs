//! arXiv search API client

use std::sync::Arc;

use papertrail_core::{FetchError, HttpSession};

use crate::feed::parse_feed;
use crate::record::{RawRecord, ResultPage};

pub const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// One paged query against a remote search API.
///
/// Implementations never retry and never cache; that is the fetcher's job.
pub trait SearchClient {
    fn fetch_page(&self, query: &str, offset: usize, limit: usize)
    -> Result<ResultPage, FetchError>;
}

impl<T: SearchClient + ?Sized> SearchClient for &T {
    fn fetch_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ResultPage, FetchError> {
        (**self).fetch_page(query, offset, limit)
    }
}

/// [`SearchClient`] for the arXiv Atom API, newest submissions first
#[derive(Debug, Clone)]
pub struct ArxivClient {
    session: Arc<HttpSession>,
    base_url: String,
}

impl ArxivClient {
    pub fn new(session: Arc<HttpSession>, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up a single paper by arXiv id (`2401.01234` or `2401.01234v2`)
    pub fn fetch_by_id(&self, id: &str) -> Result<Option<RawRecord>, FetchError> {
        let body = self
            .session
            .get_text(&self.base_url, &[("id_list", id), ("max_results", "1")])?;
        let page = parse_feed(&body)?;
        Ok(page.records.into_iter().next())
    }
}

impl SearchClient for ArxivClient {
    fn fetch_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ResultPage, FetchError> {
        let start = offset.to_string();
        let max_results = limit.to_string();
        let body = self.session.get_text(
            &self.base_url,
            &[
                ("search_query", query),
                ("start", &start),
                ("max_results", &max_results),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ],
        )?;
        parse_feed(&body)
    }
}
