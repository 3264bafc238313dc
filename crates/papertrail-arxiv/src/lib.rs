//! arXiv harvester
//!
//! Expands search terms into query units small enough to page through in
//! full, fetches them with bounded exponential backoff, deduplicates by
//! arXiv id and checkpoints to CSV after every batch.

pub mod checkpoint;
pub mod client;
pub mod config;
pub mod feed;
pub mod fetcher;
pub mod harvest;
pub mod planner;
pub mod query;
pub mod record;
mod runner;

pub use checkpoint::CsvCheckpoint;
pub use client::{ArxivClient, DEFAULT_BASE_URL, SearchClient};
pub use config::Config;
pub use fetcher::{BackoffFetcher, BatchOutcome};
pub use harvest::{Checkpoint, DateFilter, HarvestLoop, HarvestReport, HarvestState};
pub use planner::{Plan, PlannedUnit, TermPlanner};
pub use record::{DateWindow, QueryUnit, RawRecord, ResultPage};
pub use runner::{Summary, harvest_with, run};
