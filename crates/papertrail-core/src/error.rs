//! Error type for a single remote fetch

/// Failure of one request against a remote service.
///
/// Every variant is transient from the caller's point of view: the backoff
/// layer retries it, and only gives up once the attempt budget is spent.
#[derive(Debug)]
pub enum FetchError {
    /// Transport failure or non-success status
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Local read of the response body failed or timed out
    Io(std::io::Error),
    /// Response arrived but could not be understood
    Parse(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create HTTP error from reqwest error, dropping the request URL
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
