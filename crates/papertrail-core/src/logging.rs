//! Logging setup: env_logger, bridged through indicatif when bars are drawn

use std::io::Write;

use indicatif::MultiProgress;

/// Default log level chosen from CLI flags; `RUST_LOG` still overrides it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    /// `--debug` wins over quiet
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (_, true) => Self::Debug,
            (true, false) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    fn default_filter(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
        }
    }
}

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn level_color(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Logger that prints above indicatif bars instead of tearing through them.
pub struct ProgressLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl ProgressLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.matches(record) {
            let line = format!(
                "[{}{}\x1b[0m] {}",
                level_color(record.level()),
                level_label(record.level()),
                record.args()
            );
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger.
///
/// With `multi` (TTY mode) records go through [`ProgressLogger`] in color;
/// otherwise a plain timestamped format suited to log files.
pub fn init_logging(
    verbosity: Verbosity,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    let env = env_logger::Env::default().default_filter_or(verbosity.default_filter());

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();
        log::set_boxed_logger(Box::new(ProgressLogger::new(logger, multi.clone())))?;
        log::set_max_level(max_level);
        Ok(())
    } else {
        env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] {}",
                    buf.timestamp_seconds(),
                    level_label(record.level()),
                    record.args()
                )
            })
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Debug);
    }

    #[test]
    fn labels_are_fixed_width() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(level_label(level).len(), 5);
        }
    }
}
