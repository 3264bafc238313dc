//! Enrichment runs over CSV fixtures

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mockito::Matcher;
use papertrail_core::{BackoffPolicy, HttpConfig, HttpSession, ProgressContext, Table};
use papertrail_enrich::{
    COL_ABSTRACT, COL_TITLE, Config, EnrichmentFailure, Extracted, Extractor, ExtractorRegistry,
    OutputColumn, RowView, default_registry, enrich_rows, enrich_with,
};
use url::Url;

/// Echoes the last path segment as title; counts calls
struct EchoExtractor {
    calls: Arc<AtomicUsize>,
}

impl Extractor for EchoExtractor {
    fn extract(&self, url: &Url) -> Result<Extracted, EnrichmentFailure> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let last = url.path_segments().and_then(|s| s.last()).unwrap_or_default();
        if last == "boom" {
            return Err(EnrichmentFailure::new("PDF processing", "corrupt file"));
        }
        Ok(Extracted::new()
            .with(COL_TITLE, Some(format!("Title {last}")))
            .with(COL_ABSTRACT, (last != "short").then(|| format!("Abstract {last}"))))
    }
}

fn config(dir: &tempfile::TempDir) -> Config {
    Config {
        input: dir.path().join("papers.csv"),
        output: dir.path().join("out/papers_enriched.csv"),
        workers: 3,
        flush_every: 2,
        ..Default::default()
    }
}

fn quiet() -> ProgressContext {
    ProgressContext::with_tty(false)
}

#[test]
fn rows_are_filled_in_place_and_failures_get_sentinels() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    fs::write(
        &cfg.input,
        "Company,URL,Safety_category\n\
         OpenAI,https://example.org/p/one,alignment\n\
         Anthropic,https://example.org/p/boom,interpretability\n\
         DeepMind,https://unknown.net/x,robustness\n\
         OpenAI,https://sub.example.org/p/short,evals\n\
         Anthropic,,misc\n",
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ExtractorRegistry::new();
    registry.register(
        "example.org",
        EchoExtractor {
            calls: calls.clone(),
        },
    );

    let summary = enrich_with(&cfg, &registry, &quiet()).unwrap();
    assert_eq!(summary.total_rows, 5);
    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.failed, 3);
    assert_eq!(calls.load(Ordering::Relaxed), 3);

    let out = Table::read(&cfg.output).unwrap();
    assert_eq!(
        out.headers(),
        ["Company", "URL", "Safety_category", "Title", "Abstract"]
    );
    assert_eq!(out.len(), 5);
    assert_eq!(out.get(0, "Title"), Some("Title one"));
    assert_eq!(out.get(0, "Abstract"), Some("Abstract one"));
    assert_eq!(out.get(0, "Company"), Some("OpenAI"));
    assert_eq!(
        out.get(1, "Title"),
        Some("[PDF processing failed: corrupt file]")
    );
    assert_eq!(out.get(1, "Abstract"), out.get(1, "Title"));
    assert_eq!(
        out.get(2, "Abstract"),
        Some("[lookup failed: no extractor for host unknown.net]")
    );
    assert_eq!(out.get(3, "Abstract"), Some("Abstract not found"));
    assert_eq!(out.get(4, "Title"), Some("[URL failed: empty]"));
}

#[test]
fn resume_retries_only_unfinished_rows() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    fs::write(
        &cfg.input,
        "URL,Title,Abstract\n\
         https://example.org/a,Kept title,Kept abstract\n\
         https://example.org/b,,\n",
    )
    .unwrap();
    fs::create_dir_all(cfg.output.parent().unwrap()).unwrap();
    fs::write(
        &cfg.output,
        "URL,Title,Abstract\n\
         https://example.org/a,Kept title,Kept abstract\n\
         https://example.org/b,[lookup failed: timeout],[lookup failed: timeout]\n",
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ExtractorRegistry::new();
    registry.register(
        "example.org",
        EchoExtractor {
            calls: calls.clone(),
        },
    );

    let summary = enrich_with(&cfg, &registry, &quiet()).unwrap();
    assert_eq!(summary.already_done, 1);
    assert_eq!(summary.enriched, 1);
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    let out = Table::read(&cfg.output).unwrap();
    assert_eq!(out.get(0, "Title"), Some("Kept title"));
    assert_eq!(out.get(1, "Title"), Some("Title b"));
}

fn echo_registry(calls: &Arc<AtomicUsize>) -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register(
        "example.org",
        EchoExtractor {
            calls: calls.clone(),
        },
    );
    registry
}

#[test]
fn resume_fills_only_the_empty_cell_of_a_row() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    fs::write(
        &cfg.input,
        "URL,Title,Abstract
         https://example.org/a,Curated title,
         https://example.org/boom,Another curated title,
         https://example.org/c,[lookup failed: timeout],Kept abstract
",
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let summary = enrich_with(&cfg, &echo_registry(&calls), &quiet()).unwrap();
    assert_eq!(summary.already_done, 0);
    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.failed, 1);

    let out = Table::read(&cfg.output).unwrap();
    assert_eq!(out.get(0, "Title"), Some("Curated title"));
    assert_eq!(out.get(0, "Abstract"), Some("Abstract a"));
    assert_eq!(out.get(1, "Title"), Some("Another curated title"));
    assert_eq!(
        out.get(1, "Abstract"),
        Some("[PDF processing failed: corrupt file]")
    );
    assert_eq!(out.get(2, "Title"), Some("Title c"));
    assert_eq!(out.get(2, "Abstract"), Some("Kept abstract"));
}

#[test]
fn without_resume_every_output_cell_is_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.resume = false;
    fs::write(
        &cfg.input,
        "URL,Title,Abstract
https://example.org/a,Old title,Old abstract
",
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let summary = enrich_with(&cfg, &echo_registry(&calls), &quiet()).unwrap();
    assert_eq!(summary.enriched, 1);

    let out = Table::read(&cfg.output).unwrap();
    assert_eq!(out.get(0, "Title"), Some("Title a"));
    assert_eq!(out.get(0, "Abstract"), Some("Abstract a"));
}

/// Keyword stand-in for a remote classifier
fn classify(row: &RowView<'_>) -> Result<Extracted, EnrichmentFailure> {
    let text = row.get("Abstract");
    if text.is_empty() {
        return Err(EnrichmentFailure::new("LLM API call", "empty document"));
    }
    let safety = text.contains("reward") || text.contains("judges");
    Ok(Extracted::new()
        .with("Safety focus", Some(if safety { "Yes" } else { "No" }.to_string()))
        .with("Explanation", None)
        .with("Ignored", Some("not an output column".to_string())))
}

#[test]
fn classifier_step_writes_its_own_columns() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.columns = vec![
        OutputColumn::new("Safety focus").with_placeholder("Unclear"),
        OutputColumn::new("Explanation"),
    ];
    fs::write(
        &cfg.input,
        "Title,Abstract
         Reward hacking in RLHF,We study reward hacking.
         A faster tokenizer,
         Scalable oversight,Debate helps judges.
",
    )
    .unwrap();

    let summary = enrich_rows(&cfg, &classify, &quiet()).unwrap();
    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.failed, 1);

    let out = Table::read(&cfg.output).unwrap();
    assert_eq!(
        out.headers(),
        ["Title", "Abstract", "Safety focus", "Explanation"]
    );
    assert_eq!(out.get(0, "Safety focus"), Some("Yes"));
    assert_eq!(out.get(0, "Explanation"), Some("Explanation not found"));
    assert_eq!(out.get(0, "Title"), Some("Reward hacking in RLHF"));
    assert_eq!(
        out.get(1, "Safety focus"),
        Some("[LLM API call failed: empty document]")
    );
    assert_eq!(out.get(1, "Explanation"), out.get(1, "Safety focus"));
    assert_eq!(out.get(2, "Safety focus"), Some("Yes"));

    // a second pass retries only the failed row
    let summary = enrich_rows(&cfg, &classify, &quiet()).unwrap();
    assert_eq!(summary.already_done, 2);
    assert_eq!(summary.failed, 1);
}

#[test]
fn missing_url_column_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    fs::write(&cfg.input, "Link\nhttps://arxiv.org/abs/1\n").unwrap();
    let err = enrich_with(&cfg, &ExtractorRegistry::new(), &quiet()).unwrap_err();
    assert!(err.to_string().contains("no 'URL' column"));
}

const ENTRY: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <opensearch:totalResults>1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v3</id>
    <published>2024-01-01T00:00:00Z</published>
    <title>Weak-to-Strong
      Generalization</title>
    <summary>Superalignment.</summary>
  </entry>
</feed>"#;

#[test]
fn arxiv_rows_use_id_lookup() {
    let mut server = mockito::Server::new();
    let ok = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("id_list".into(), "2401.00001".into()))
        .with_status(200)
        .with_body(ENTRY)
        .create();
    let failing = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("id_list".into(), "2402.00002".into()))
        .with_status(500)
        .expect(2)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.arxiv_base_url = format!("{}/api/query", server.url());
    cfg.retry = BackoffPolicy {
        max_attempts: 2,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        factor: 1,
    };
    fs::write(
        &cfg.input,
        "URL\nhttps://arxiv.org/abs/2401.00001\nhttps://arxiv.org/pdf/2402.00002.pdf\n",
    )
    .unwrap();

    let session = Arc::new(HttpSession::new(&HttpConfig::default()).unwrap());
    let registry = default_registry(&cfg, session);
    let summary = enrich_with(&cfg, &registry, &quiet()).unwrap();

    ok.assert();
    failing.assert();
    assert_eq!(summary.enriched, 1);
    assert_eq!(summary.failed, 1);

    let out = Table::read(&cfg.output).unwrap();
    assert_eq!(out.get(0, "Title"), Some("Weak-to-Strong Generalization"));
    assert_eq!(out.get(0, "Abstract"), Some("Superalignment."));
    let sentinel = out.get(1, "Title").unwrap();
    assert!(sentinel.starts_with("[arXiv lookup failed: HTTP 500"), "{sentinel}");
}
