//! Harvest subcommand - page arXiv search results into a checkpoint CSV

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use papertrail_core::{HttpSession, ProgressContext};

use super::print_summary;
use crate::config::{Config, parse_date};

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Search terms matched against titles (default: from config)
    pub terms: Vec<String>,

    /// arXiv category, repeatable (default: cs.AI and cs.LG)
    #[arg(short = 'C', long = "category")]
    pub categories: Vec<String>,

    /// First submission date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last submission date (YYYY-MM-DD, default: today)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Drop records published before this date
    #[arg(long, value_parser = parse_date)]
    pub not_before: Option<NaiveDate>,

    /// Drop records published after this date
    #[arg(long, value_parser = parse_date)]
    pub not_after: Option<NaiveDate>,

    /// Results reachable through paging for one query
    #[arg(long)]
    pub cap: Option<usize>,

    /// Records requested per call
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Seconds to wait after each successful batch
    #[arg(long)]
    pub delay: Option<u64>,

    /// Checkpoint CSV (default: data_<Mon>_<DD>.csv)
    #[arg(short = 'o', long)]
    pub checkpoint: Option<PathBuf>,

    /// Keep over-cap years whole instead of splitting them into months
    #[arg(long)]
    pub no_month_split: bool,
}

pub fn run(args: HarvestArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let mut config = config.clone();
    apply_args(&mut config, args);
    let harvest = config.harvest_config(Local::now().date_naive())?;

    log::info!(
        "Harvesting {} terms over {} into {}",
        harvest.terms.len(),
        harvest.window,
        harvest.checkpoint_path.display()
    );

    let session = HttpSession::new(&config.http.session_config())
        .context("Failed to start HTTP client")?;
    let summary = papertrail_arxiv::run(&harvest, Arc::new(session), progress)?;

    if progress.is_tty() {
        print_summary("arXiv harvest", &summary.rows());
    } else {
        summary.log();
    }
    Ok(())
}

fn apply_args(config: &mut Config, args: HarvestArgs) {
    let h = &mut config.harvest;
    if !args.terms.is_empty() {
        h.terms = args.terms;
    }
    if !args.categories.is_empty() {
        h.categories = args.categories;
    }
    h.start_date = args.start.unwrap_or(h.start_date);
    h.end_date = args.end.or(h.end_date);
    h.not_before = args.not_before.or(h.not_before);
    h.not_after = args.not_after.or(h.not_after);
    h.per_query_cap = args.cap.unwrap_or(h.per_query_cap);
    h.batch_size = args.batch_size.unwrap_or(h.batch_size);
    h.politeness_secs = args.delay.unwrap_or(h.politeness_secs);
    if args.checkpoint.is_some() {
        h.checkpoint = args.checkpoint;
    }
    if args.no_month_split {
        h.split_months = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> HarvestArgs {
        HarvestArgs {
            terms: vec![],
            categories: vec![],
            start: None,
            end: None,
            not_before: None,
            not_after: None,
            cap: None,
            batch_size: None,
            delay: None,
            checkpoint: None,
            no_month_split: false,
        }
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = Config::default();
        config.harvest.terms = vec!["from file".into()];
        config.harvest.batch_size = 50;

        apply_args(
            &mut config,
            HarvestArgs {
                terms: vec!["safety".into()],
                start: NaiveDate::from_ymd_opt(2023, 1, 1),
                no_month_split: true,
                ..args()
            },
        );

        assert_eq!(config.harvest.terms, vec!["safety"]);
        assert_eq!(config.harvest.start_date.to_string(), "2023-01-01");
        assert_eq!(config.harvest.batch_size, 50);
        assert_eq!(config.harvest.categories, vec!["cs.AI", "cs.LG"]);
        assert!(!config.harvest.split_months);
    }
}
