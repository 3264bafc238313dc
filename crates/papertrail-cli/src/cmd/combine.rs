//! Combine subcommand - merge harvest CSVs, first arXiv id wins

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use papertrail_core::{ProgressContext, fmt_num};
use papertrail_snapshot::combine_files;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Input CSVs in priority order (default: from config)
    pub inputs: Vec<PathBuf>,

    /// Combined output CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: CombineArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let inputs = if args.inputs.is_empty() {
        config.combine.inputs.clone()
    } else {
        args.inputs
    };
    if inputs.is_empty() {
        anyhow::bail!("no input files given");
    }
    let output = args.output.unwrap_or_else(|| config.combine.output.clone());

    let stats = combine_files(&inputs, &output, &config.combine.options())?;

    if progress.is_tty() {
        print_summary(
            "Combine",
            &[
                ("Files read", fmt_num(stats.files_read)),
                ("Files missing", fmt_num(stats.missing.len())),
                ("Rows in", fmt_num(stats.rows_in)),
                ("Duplicates dropped", fmt_num(stats.duplicates())),
                ("Rows out", fmt_num(stats.rows_out)),
                ("Output", output.display().to_string()),
            ],
        );
    }
    Ok(())
}
