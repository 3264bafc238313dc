//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: indicatif bars (one per query unit or batch job).
//! Non-TTY mode: bars are hidden and log lines carry the progress.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

fn count_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<24.dim} {bar:30.green/dim} {pos:>6}/{len:6} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    /// Create a context with bars forced on or off
    pub fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Counting bar for `total` items; hidden when not on a TTY.
    pub fn count_bar(&self, label: &str, total: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(count_style());
        pb.set_prefix(truncate_label(label, 24));
        pb
    }

    /// Spinner line for a stage without a known total.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut a label to `max` chars on a char boundary, marking the cut
fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let mut out: String = label.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_small() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(999), "999");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(123_456), "123,456");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn truncate_label_multibyte() {
        assert_eq!(truncate_label("safety", 24), "safety");
        assert_eq!(truncate_label("ééééé", 3), "éé…");
    }

    #[test]
    fn non_tty_bars_are_hidden() {
        let ctx = ProgressContext::with_tty(false);
        assert!(ctx.count_bar("unit", 10).is_hidden());
        assert!(ctx.stage_line("stage").is_hidden());
    }
}
