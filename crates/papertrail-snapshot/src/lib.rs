//! Snapshot tools for paper lists: diff two versions, combine several files

pub mod combine;
pub mod diff;

pub use combine::{CombineOptions, CombineStats, combine_files, combine_tables};
pub use diff::{DiffCounts, DiffOptions, DiffStatus, diff_files, diff_tables, snapshot_paths};
