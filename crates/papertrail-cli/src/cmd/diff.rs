//! Diff subcommand - compare old and new paper-list snapshots

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use papertrail_core::ProgressContext;
use papertrail_snapshot::{diff_files, snapshot_paths};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Old snapshot CSV
    #[arg(requires = "new")]
    pub old: Option<PathBuf>,

    /// New snapshot CSV
    pub new: Option<PathBuf>,

    /// Comparison CSV (required with OLD and NEW)
    #[arg(short, long, requires = "old")]
    pub output: Option<PathBuf>,

    /// Compare old_<NAME>.csv with new_<NAME>.csv, repeatable (default: from config)
    #[arg(long = "company", conflicts_with = "old")]
    pub companies: Vec<String>,

    /// Directory holding per-company snapshots
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

pub fn run(args: DiffArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let opts = config.diff.options();

    let jobs = match (args.old, args.new) {
        (Some(old), Some(new)) => {
            let Some(output) = args.output else {
                anyhow::bail!("--output is required when comparing two files");
            };
            let label = old
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            vec![(label, old, new, output)]
        }
        _ => {
            let dir = args.dir.unwrap_or_else(|| config.diff.dir.clone());
            let companies = if args.companies.is_empty() {
                config.diff.companies.clone()
            } else {
                args.companies
            };
            if companies.is_empty() {
                anyhow::bail!("nothing to compare: give OLD NEW -o OUT or --company NAME");
            }
            companies
                .into_iter()
                .map(|name| {
                    let (old, new, out) = snapshot_paths(&dir, &name);
                    (name, old, new, out)
                })
                .collect()
        }
    };

    let mut rows = Vec::with_capacity(jobs.len());
    for (label, old, new, output) in jobs {
        let counts = diff_files(&old, &new, &output, &opts)?;
        rows.push((
            label,
            format!(
                "{} new, {} old, {} both -> {}",
                counts.new,
                counts.old,
                counts.both,
                output.display()
            ),
        ));
    }

    if progress.is_tty() {
        let rows: Vec<(&str, String)> = rows
            .iter()
            .map(|(label, counts)| (label.as_str(), counts.clone()))
            .collect();
        print_summary("Snapshot diff", &rows);
    }
    Ok(())
}
