//! Bounded-retry page fetching

use papertrail_core::{BackoffPolicy, Exhausted, FetchError, Sleeper, retry_with_backoff};

use crate::client::SearchClient;
use crate::record::RawRecord;

/// Result of one batch request after retries
#[derive(Debug)]
pub enum BatchOutcome {
    Fetched(Vec<RawRecord>),
    /// Every attempt failed; the batch is skipped, not the run
    Exhausted { attempts: u32, last_error: FetchError },
}

/// Wraps a [`SearchClient`] with exponential backoff.
///
/// A page with no records while records were requested counts as a failed
/// attempt: the API answers transient overload with an empty feed.
pub struct BackoffFetcher<C, S> {
    client: C,
    policy: BackoffPolicy,
    sleeper: S,
}

impl<C: SearchClient, S: Sleeper> BackoffFetcher<C, S> {
    pub fn new(client: C, policy: BackoffPolicy, sleeper: S) -> Self {
        Self {
            client,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn fetch_batch(&self, query: &str, offset: usize, limit: usize) -> BatchOutcome {
        let label = format!("batch @{offset}+{limit}");
        let result = retry_with_backoff(&label, &self.policy, &self.sleeper, |_| {
            let page = self.client.fetch_page(query, offset, limit)?;
            if page.records.is_empty() && limit > 0 {
                return Err(FetchError::parse(format!(
                    "empty page (server reports {} matches)",
                    page.total_estimate
                )));
            }
            Ok(page.records)
        });
        match result {
            Ok(records) => BatchOutcome::Fetched(records),
            Err(Exhausted {
                attempts,
                last_error,
            }) => {
                log::warn!(
                    "Skipping batch at offset {offset} (limit {limit}) after {attempts} attempts: {last_error}"
                );
                BatchOutcome::Exhausted {
                    attempts,
                    last_error,
                }
            }
        }
    }

    /// Result count for `query`; zero is a valid answer here
    pub fn probe(&self, query: &str) -> Result<usize, Exhausted<FetchError>> {
        retry_with_backoff("probe", &self.policy, &self.sleeper, |_| {
            self.client
                .fetch_page(query, 0, 1)
                .map(|page| page.total_estimate)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ResultPage;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSleeper(RefCell<Vec<Duration>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    /// Replays scripted responses, then keeps failing
    struct Scripted {
        responses: RefCell<VecDeque<Result<ResultPage, FetchError>>>,
        calls: RefCell<Vec<(usize, usize)>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<ResultPage, FetchError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::default(),
            }
        }
    }

    impl SearchClient for Scripted {
        fn fetch_page(
            &self,
            _query: &str,
            offset: usize,
            limit: usize,
        ) -> Result<ResultPage, FetchError> {
            self.calls.borrow_mut().push((offset, limit));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::parse("script exhausted")))
        }
    }

    fn page(ids: &[&str], total: usize) -> ResultPage {
        ResultPage {
            records: ids
                .iter()
                .map(|id| RawRecord {
                    external_id: id.to_string(),
                    title: format!("Paper {id}"),
                    authors: vec![],
                    abstract_text: String::new(),
                    published: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
                    pdf_link: RawRecord::pdf_link_for(id),
                })
                .collect(),
            total_estimate: total,
        }
    }

    fn http_err() -> FetchError {
        FetchError::Http {
            status: Some(503),
            message: "unavailable".into(),
        }
    }

    fn secs(v: &[u64]) -> Vec<Duration> {
        v.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn succeeds_after_k_failures() {
        let client = Scripted::new(vec![
            Err(http_err()),
            Ok(page(&[], 10)),
            Err(http_err()),
            Ok(page(&["a", "b"], 10)),
        ]);
        let fetcher =
            BackoffFetcher::new(&client, BackoffPolicy::default(), RecordingSleeper::default());
        match fetcher.fetch_batch("q", 20, 2) {
            BatchOutcome::Fetched(records) => assert_eq!(records.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*fetcher.sleeper().0.borrow(), secs(&[3, 6, 12]));
        assert_eq!(*client.calls.borrow(), vec![(20, 2); 4]);
    }

    #[test]
    fn exhausted_after_budget() {
        let client = Scripted::new(vec![]);
        let policy = BackoffPolicy {
            max_attempts: 7,
            ..Default::default()
        };
        let fetcher = BackoffFetcher::new(&client, policy, RecordingSleeper::default());
        match fetcher.fetch_batch("q", 0, 100) {
            BatchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 7);
                assert!(last_error.to_string().contains("script exhausted"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            *fetcher.sleeper().0.borrow(),
            secs(&[3, 6, 12, 24, 48, 60, 60])
        );
        assert_eq!(client.calls.borrow().len(), 7);
    }

    #[test]
    fn zero_limit_accepts_empty_page() {
        let client = Scripted::new(vec![Ok(page(&[], 0))]);
        let fetcher =
            BackoffFetcher::new(&client, BackoffPolicy::default(), RecordingSleeper::default());
        assert!(matches!(
            fetcher.fetch_batch("q", 0, 0),
            BatchOutcome::Fetched(r) if r.is_empty()
        ));
        assert!(fetcher.sleeper().0.borrow().is_empty());
    }

    #[test]
    fn probe_returns_estimate_including_zero() {
        let client = Scripted::new(vec![Err(http_err()), Ok(page(&[], 0))]);
        let fetcher =
            BackoffFetcher::new(&client, BackoffPolicy::default(), RecordingSleeper::default());
        assert_eq!(fetcher.probe("q").unwrap(), 0);
        assert_eq!(*client.calls.borrow(), vec![(0, 1), (0, 1)]);
    }

    #[test]
    fn probe_exhaustion_is_error() {
        let client = Scripted::new(vec![]);
        let policy = BackoffPolicy {
            max_attempts: 2,
            ..Default::default()
        };
        let fetcher = BackoffFetcher::new(&client, policy, RecordingSleeper::default());
        assert_eq!(fetcher.probe("q").unwrap_err().attempts, 2);
    }
}
