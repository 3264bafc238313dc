//! papertrail - Track AI-safety papers from arXiv and company publication lists
//!
//! Harvests arXiv search results into a checkpointed CSV, enriches URL lists
//! with titles and abstracts, and diffs or combines CSV snapshots.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use papertrail_core::{ProgressContext, Verbosity, fmt_num};

#[derive(Parser)]
#[command(name = "papertrail")]
#[command(about = "Harvest, enrich and compare research paper lists")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./papertrail.toml or ~/.config/papertrail/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,

    /// Maximum attempts per arXiv batch
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest arXiv search results into a checkpoint CSV
    Harvest(cmd::harvest::HarvestArgs),
    /// Fill in titles and abstracts for a CSV of paper URLs
    Enrich(cmd::enrich::EnrichArgs),
    /// Compare old and new snapshots of a paper list
    Diff(cmd::diff::DiffArgs),
    /// Merge harvest CSVs, dropping repeated arXiv ids
    Combine(cmd::combine::CombineArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug; bars show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let verbosity = Verbosity::from_flags(is_tty, cli.debug);
    papertrail_core::init_logging(verbosity, multi)?;

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    if let Some(secs) = cli.read_timeout {
        config.http.read_timeout = secs;
    }
    if let Some(attempts) = cli.max_retries {
        config.backoff.max_attempts = attempts;
    }

    match cli.command {
        Command::Harvest(args) => cmd::harvest::run(args, &config, &progress),
        Command::Enrich(args) => cmd::enrich::run(args, &config, &progress),
        Command::Diff(args) => cmd::diff::run(args, &config, &progress),
        Command::Combine(args) => cmd::combine::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            let h = &config.harvest;
            let terms = if h.terms.is_empty() {
                "(none)".to_string()
            } else {
                h.terms.join(", ")
            };
            table.add_row(vec!["Search terms", &terms]);
            table.add_row(vec!["Categories", &h.categories.join(" OR ")]);
            let end = match h.end_date {
                Some(day) => day.to_string(),
                None => "today".to_string(),
            };
            table.add_row(vec!["Window", &format!("{} .. {end}", h.start_date)]);
            table.add_row(vec!["Per-query cap", &fmt_num(h.per_query_cap)]);
            table.add_row(vec!["Batch size", &h.batch_size.to_string()]);
            table.add_row(vec!["Politeness delay", &format!("{}s", h.politeness_secs)]);
            let checkpoint = match &h.checkpoint {
                Some(path) => path.display().to_string(),
                None => "data_<Mon>_<DD>.csv".to_string(),
            };
            table.add_row(vec!["Checkpoint", &checkpoint]);
            table.add_row(vec!["arXiv base URL", &h.base_url]);
            table.add_row(vec![
                "Backoff",
                &format!(
                    "{} attempts, {}s x{} up to {}s",
                    config.backoff.max_attempts,
                    config.backoff.initial_secs,
                    config.backoff.factor,
                    config.backoff.max_secs
                ),
            ]);
            table.add_row(vec![
                "Read timeout",
                &format!("{}s", config.http.read_timeout),
            ]);
            table.add_row(vec![
                "Contact",
                if config.http.contact.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec![
                "Enrich workers",
                &format!(
                    "{} (flush every {})",
                    config.enrich.workers, config.enrich.flush_every
                ),
            ]);
            table.add_row(vec!["Diff companies", &config.diff.companies.join(", ")]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
