//! Per-row enrichment failure

use std::fmt;

/// A row could not be enriched at some stage.
///
/// Never fatal: the row keeps its place in the output with the
/// [`sentinel`](Self::sentinel) text in every enriched column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentFailure {
    pub stage: String,
    pub message: String,
}

impl EnrichmentFailure {
    pub fn new(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// `[<stage> failed: <message>]`
    pub fn sentinel(&self) -> String {
        format!("[{self}]")
    }

    /// Whether a cell holds a sentinel written by an earlier run
    pub fn is_sentinel(cell: &str) -> bool {
        cell.starts_with('[') && cell.ends_with(']') && cell.contains(" failed: ")
    }
}

impl fmt::Display for EnrichmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

impl std::error::Error for EnrichmentFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_format() {
        let f = EnrichmentFailure::new("PDF processing", "HTTP 404: not found");
        assert_eq!(f.sentinel(), "[PDF processing failed: HTTP 404: not found]");
        assert!(EnrichmentFailure::is_sentinel(&f.sentinel()));
    }

    #[test]
    fn ordinary_text_is_not_sentinel() {
        assert!(!EnrichmentFailure::is_sentinel("A [bracketed] title"));
        assert!(!EnrichmentFailure::is_sentinel(""));
    }
}
