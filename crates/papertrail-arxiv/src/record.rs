//! Harvest data model: date windows, query units, result records

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};

/// Inclusive date range `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `None` if `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Overlap with `other`, if any
    pub fn intersect(&self, other: &DateWindow) -> Option<DateWindow> {
        Self::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// One window per calendar year touching this window, clipped to it
    pub fn years(&self) -> Vec<DateWindow> {
        (self.start.year()..=self.end.year())
            .filter_map(|y| {
                let year = Self::new(
                    NaiveDate::from_ymd_opt(y, 1, 1)?,
                    NaiveDate::from_ymd_opt(y, 12, 31)?,
                )?;
                self.intersect(&year)
            })
            .collect()
    }

    /// One window per calendar month touching this window, clipped to it
    pub fn months(&self) -> Vec<DateWindow> {
        let mut out = Vec::new();
        let Some(mut first) = NaiveDate::from_ymd_opt(self.start.year(), self.start.month(), 1)
        else {
            return out;
        };
        while first <= self.end {
            let Some(next) = first.checked_add_months(Months::new(1)) else {
                break;
            };
            let last = next.pred_opt().unwrap_or(next);
            if let Some(month) = Self::new(first, last).and_then(|m| self.intersect(&m)) {
                out.push(month);
            }
            first = next;
        }
        out
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One bounded query the harvester will paginate in full
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUnit {
    pub term: String,
    pub window: DateWindow,
}

impl fmt::Display for QueryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' [{}]", self.term, self.window)
    }
}

/// A paper as returned by the search API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// arXiv identifier, e.g. `2401.01234v2`; the dedup key
    pub external_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub published: NaiveDate,
    pub pdf_link: String,
}

impl RawRecord {
    pub fn pdf_link_for(external_id: &str) -> String {
        format!("https://arxiv.org/pdf/{external_id}")
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub records: Vec<RawRecord>,
    /// Server's count of all matches for the query, not just this page
    pub total_estimate: usize,
}
