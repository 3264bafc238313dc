//! Enrich subcommand - fill Title and Abstract columns from paper URLs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use papertrail_core::{HttpSession, ProgressContext};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Input CSV with a URL column
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output CSV, rewritten as rows complete
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Write the output every N completed rows
    #[arg(long)]
    pub flush_every: Option<usize>,

    /// Start over instead of continuing from an existing output file
    #[arg(long)]
    pub no_resume: bool,
}

pub fn run(args: EnrichArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let mut enrich = config.enrich_config();
    if let Some(input) = args.input {
        enrich.input = input;
    }
    if let Some(output) = args.output {
        enrich.output = output;
    }
    enrich.workers = args.workers.unwrap_or(enrich.workers).max(1);
    enrich.flush_every = args.flush_every.unwrap_or(enrich.flush_every).max(1);
    if args.no_resume {
        enrich.resume = false;
    }

    log::info!(
        "Enriching {} -> {} with {} workers",
        enrich.input.display(),
        enrich.output.display(),
        enrich.workers
    );

    let session = HttpSession::new(&config.http.session_config())
        .context("Failed to start HTTP client")?;
    let summary = papertrail_enrich::run(&enrich, Arc::new(session), progress)?;

    if progress.is_tty() {
        print_summary("Enrichment", &summary.rows());
    } else {
        summary.log();
    }
    Ok(())
}
