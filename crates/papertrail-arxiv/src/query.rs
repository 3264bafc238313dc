//! arXiv search-query expressions
//!
//! Grammar used: `ti:` title match, `cat:` category match,
//! `submittedDate:[YYYYMMDD TO YYYYMMDD]`, joined with `AND` / `OR`.

use crate::record::DateWindow;

/// Title predicate: exact phrase for multi-word terms, bare word otherwise
pub fn term_predicate(term: &str) -> String {
    let term = term.trim();
    if term.contains(char::is_whitespace) {
        format!("ti:\"{term}\"")
    } else {
        format!("ti:{term}")
    }
}

/// `(cat:a OR cat:b)`; a single category is left unparenthesised and an
/// empty list yields an empty string
pub fn category_filter(categories: &[String]) -> String {
    let cats: Vec<String> = categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("cat:{c}"))
        .collect();
    match cats.len() {
        0 => String::new(),
        1 => cats[0].clone(),
        _ => format!("({})", cats.join(" OR ")),
    }
}

pub fn date_predicate(window: &DateWindow) -> String {
    format!(
        "submittedDate:[{} TO {}]",
        window.start.format("%Y%m%d"),
        window.end.format("%Y%m%d")
    )
}

/// Full query for one term over one window
pub fn build_query(term: &str, category_filter: &str, window: &DateWindow) -> String {
    let mut parts = vec![format!("({})", term_predicate(term))];
    if !category_filter.is_empty() {
        parts.push(category_filter.to_string());
    }
    parts.push(date_predicate(window));
    parts.join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn single_word_unquoted() {
        assert_eq!(term_predicate("safety"), "ti:safety");
        assert_eq!(term_predicate("  robust "), "ti:robust");
    }

    #[test]
    fn phrase_quoted() {
        assert_eq!(term_predicate("scalable oversight"), "ti:\"scalable oversight\"");
    }

    #[test]
    fn categories() {
        assert_eq!(category_filter(&[]), "");
        assert_eq!(category_filter(&["cs.AI".into()]), "cat:cs.AI");
        assert_eq!(
            category_filter(&["cs.AI".into(), " ".into(), "cs.LG".into()]),
            "(cat:cs.AI OR cat:cs.LG)"
        );
    }

    #[test]
    fn full_query() {
        let cats = category_filter(&["cs.AI".into(), "cs.LG".into()]);
        assert_eq!(
            build_query("human feedback", &cats, &window()),
            "(ti:\"human feedback\") AND (cat:cs.AI OR cat:cs.LG) AND submittedDate:[20220101 TO 20241231]"
        );
    }

    #[test]
    fn query_without_categories() {
        assert_eq!(
            build_query("safety", "", &window()),
            "(ti:safety) AND submittedDate:[20220101 TO 20241231]"
        );
    }
}
