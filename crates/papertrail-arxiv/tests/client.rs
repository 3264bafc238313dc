//! ArxivClient against a mock HTTP server

use std::sync::Arc;

use mockito::Matcher;
use papertrail_arxiv::{ArxivClient, SearchClient};
use papertrail_core::{FetchError, HttpConfig, HttpSession};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <opensearch:totalResults>57</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/2403.11111v1</id>
    <published>2024-03-18T17:00:00Z</published>
    <title>Scalable Oversight in Practice</title>
    <summary>We report.</summary>
    <author><name>Jane Doe</name></author>
  </entry>
</feed>"#;

fn client(server: &mockito::Server) -> ArxivClient {
    let session = HttpSession::new(&HttpConfig::default()).unwrap();
    ArxivClient::new(Arc::new(session), format!("{}/api/query", server.url()))
}

#[test]
fn fetch_page_sends_paging_and_sort_params() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search_query".into(), "(ti:oversight) AND cat:cs.AI".into()),
            Matcher::UrlEncoded("start".into(), "200".into()),
            Matcher::UrlEncoded("max_results".into(), "100".into()),
            Matcher::UrlEncoded("sortBy".into(), "submittedDate".into()),
            Matcher::UrlEncoded("sortOrder".into(), "descending".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(FEED)
        .create();

    let page = client(&server)
        .fetch_page("(ti:oversight) AND cat:cs.AI", 200, 100)
        .unwrap();

    mock.assert();
    assert_eq!(page.total_estimate, 57);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].external_id, "2403.11111v1");
    assert_eq!(page.records[0].authors, vec!["Jane Doe"]);
}

#[test]
fn server_error_is_http_error_with_status() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .expect(1)
        .create();

    let err = client(&server).fetch_page("ti:x", 0, 10).unwrap_err();

    mock.assert();
    assert_eq!(err.status(), Some(503));
}

#[test]
fn garbage_body_is_parse_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("Rate exceeded.")
        .create();

    let err = client(&server).fetch_page("ti:x", 0, 10).unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[test]
fn fetch_by_id_uses_id_list() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("id_list".into(), "2403.11111".into()),
            Matcher::UrlEncoded("max_results".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(FEED)
        .create();

    let record = client(&server).fetch_by_id("2403.11111").unwrap().unwrap();

    mock.assert();
    assert_eq!(record.title, "Scalable Oversight in Practice");
    assert_eq!(record.pdf_link, "https://arxiv.org/pdf/2403.11111v1");
}
