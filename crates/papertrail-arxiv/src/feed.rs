//! arXiv Atom feed parser using quick-xml
//!
//! Reads `entry/{id,title,summary,published,author/name}` and the
//! `opensearch:totalResults` count. Namespace prefixes are ignored.

use chrono::NaiveDate;
use papertrail_core::FetchError;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::record::{RawRecord, ResultPage};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
    TotalResults,
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
}

impl EntryBuilder {
    fn build(self) -> Result<RawRecord, FetchError> {
        let external_id = external_id_from_url(&self.id)
            .ok_or_else(|| FetchError::parse(format!("entry without usable id: {:?}", self.id)))?;
        let published = parse_published(&self.published).ok_or_else(|| {
            FetchError::parse(format!(
                "{external_id}: bad published date {:?}",
                self.published
            ))
        })?;
        Ok(RawRecord {
            pdf_link: RawRecord::pdf_link_for(&external_id),
            external_id,
            title: normalize_ws(&self.title),
            authors: self.authors.iter().map(|a| normalize_ws(a)).collect(),
            abstract_text: normalize_ws(&self.summary),
            published,
        })
    }
}

/// `http://arxiv.org/abs/2401.01234v1` → `2401.01234v1`
pub fn external_id_from_url(url: &str) -> Option<String> {
    let id = url.trim().rsplit("/abs/").next()?.trim();
    (!id.is_empty() && !id.contains("://")).then(|| id.to_string())
}

/// Date part of an RFC 3339 timestamp (`2024-01-02T18:59:59Z`)
fn parse_published(s: &str) -> Option<NaiveDate> {
    let date = s.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Trim and collapse internal whitespace runs (titles wrap across lines)
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse one page of search results.
///
/// Entries that cannot be turned into a record are skipped with a debug
/// log; an API error entry or a missing result count fails the whole page.
pub fn parse_feed(xml: &str) -> Result<ResultPage, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = ResultPage::default();
    let mut total: Option<usize> = None;
    let mut entry: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let next = match (e.local_name().as_ref(), entry.is_some(), in_author) {
                    (b"entry", false, _) => {
                        entry = Some(EntryBuilder::default());
                        None
                    }
                    (b"author", true, _) => {
                        in_author = true;
                        None
                    }
                    (b"name", true, true) => Some(Field::AuthorName),
                    (b"id", true, false) => Some(Field::Id),
                    (b"title", true, false) => Some(Field::Title),
                    (b"summary", true, false) => Some(Field::Summary),
                    (b"published", true, false) => Some(Field::Published),
                    (b"totalResults", false, _) => Some(Field::TotalResults),
                    _ => None,
                };
                if next.is_some() {
                    field = next;
                    text.clear();
                }
            }
            Ok(Event::Text(t)) if field.is_some() => {
                let s = t
                    .unescape()
                    .map_err(|e| FetchError::parse(format!("bad text: {e}")))?;
                text.push_str(&s);
            }
            Ok(Event::CData(t)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(done) = entry.take() {
                        if done.id.contains("/api/errors") {
                            return Err(FetchError::parse(format!(
                                "arXiv API error: {}",
                                normalize_ws(&done.summary)
                            )));
                        }
                        match done.build() {
                            Ok(record) => page.records.push(record),
                            Err(err) => log::debug!("Skipping feed entry: {err}"),
                        }
                    }
                    in_author = false;
                    field = None;
                }
                b"author" => in_author = false,
                _ => {
                    if let Some(f) = field.take() {
                        let value = std::mem::take(&mut text);
                        match (f, entry.as_mut()) {
                            (Field::TotalResults, _) => {
                                total = Some(value.trim().parse().map_err(|_| {
                                    FetchError::parse(format!("bad totalResults: {value:?}"))
                                })?);
                            }
                            (Field::Id, Some(b)) => b.id = value,
                            (Field::Title, Some(b)) => b.title = value,
                            (Field::Summary, Some(b)) => b.summary = value,
                            (Field::Published, Some(b)) => b.published = value,
                            (Field::AuthorName, Some(b)) => b.authors.push(value),
                            _ => {}
                        }
                    }
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FetchError::parse(format!(
                    "malformed feed at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    page.total_estimate =
        total.ok_or_else(|| FetchError::parse("feed has no totalResults element"))?;
    Ok(page)
}
