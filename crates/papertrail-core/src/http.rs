//! Blocking HTTP access for batch jobs.
//!
//! Uses async reqwest internally with `tokio::time::timeout` for stall
//! detection, but presents a sync interface: harvest loops are sequential and
//! enrichment workers run on rayon threads.

use std::io;
use std::time::Duration;

use crate::error::FetchError;

/// Timeouts and identification for outgoing requests
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Upper bound on a whole request, headers through body
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            user_agent: concat!("papertrail/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP client plus the runtime that drives it.
///
/// One session is created per command and handed to every component that
/// talks to the network. `get_text` may be called from several threads at
/// once.
pub struct HttpSession {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    read_timeout: Duration,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpSession {
    pub fn new(config: &HttpConfig) -> io::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(8)
            .build()
            .map_err(io::Error::other)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("papertrail-http")
            .enable_all()
            .build()?;

        Ok(Self {
            client,
            runtime,
            read_timeout: config.read_timeout,
        })
    }

    /// GET `url` with `query` parameters and return the body as text.
    ///
    /// Non-2xx statuses are errors. Blocks the calling thread.
    pub fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        self.runtime.block_on(async {
            let request = async {
                let response = self
                    .client
                    .get(url)
                    .query(query)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(FetchError::from_reqwest)?;
                response.text().await.map_err(FetchError::from_reqwest)
            };

            match tokio::time::timeout(self.read_timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no response within {}s", self.read_timeout.as_secs()),
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_timeouts() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("papertrail/"));
    }

    #[test]
    fn unreachable_host_is_http_error() {
        let config = HttpConfig {
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let session = HttpSession::new(&config).unwrap();
        // Port 9 (discard) on localhost is closed in test environments
        let err = session.get_text("http://127.0.0.1:9/", &[]).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Http { status: None, .. } | FetchError::Io(_)
        ));
    }
}
