//! Papertrail Core - Common infrastructure for paper-tracking batch jobs
//!
//! HTTP access, retry with backoff, atomic CSV output, logging and progress
//! shared by the arXiv harvester, the enrichment pool and the snapshot tools.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod sink;
pub mod table;
pub mod work_queue;

// Re-exports for convenience
pub use error::FetchError;
pub use http::{HttpConfig, HttpSession};
pub use logging::{ProgressLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use retry::{BackoffPolicy, Exhausted, Sleeper, ThreadSleeper, retry_with_backoff};
pub use sink::{CsvSink, cleanup_tmp_file};
pub use table::Table;
pub use work_queue::WorkQueue;
