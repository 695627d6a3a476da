//! Loader strategy tests against in-process, mock-HTTP and on-disk sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use oa_context::builtin::{CREDENTIALS_V1, ODRL};
use oa_context::fetch::CONTEXT_ACCEPT;
use oa_context::{
    build_resolver_with_fetcher, CacheOnFirstCallLoader, ContextError, ContextFetcher,
    ContextResolver, ContextStrategy, FetchError, HttpContextFetcher, LoaderConfig,
    LocalFirstLoader, SlotState,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serves `{"@context": {"<url>": "ex:x"}}` for every URL, slowly, and
/// counts how often each URL was requested.
#[derive(Default)]
struct CountingFetcher {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl CountingFetcher {
    fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ContextFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if url.contains("broken") {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(json!({"@context": {url: "ex:x"}}))
    }
}

/// A network that is always down; counts the URLs it was asked for.
#[derive(Default)]
struct OfflineFetcher {
    calls: Mutex<HashMap<String, usize>>,
}

impl OfflineFetcher {
    fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ContextFetcher for OfflineFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        Err(FetchError::Status {
            url: url.to_string(),
            status: 503,
        })
    }
}

#[tokio::test]
async fn caching_strategies_serve_builtins_offline() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = LoaderConfig::new(dir.path());

    for strategy in [ContextStrategy::CacheOnFirstCall, ContextStrategy::LocalFirst] {
        let fetcher = Arc::new(OfflineFetcher::default());
        let resolver = build_resolver_with_fetcher(strategy, &config, fetcher.clone()).unwrap();
        let odrl = resolver.resolve(ODRL).await.unwrap();
        assert!(odrl.context().is_some(), "{strategy:?}");
        assert_eq!(fetcher.calls_for(ODRL), 0, "{strategy:?}");

        let credentials = resolver.resolve(CREDENTIALS_V1).await;
        match strategy {
            // Well-known URLs are left to the first-call fetch.
            ContextStrategy::CacheOnFirstCall => {
                assert!(credentials.is_err());
                assert_eq!(fetcher.calls_for(CREDENTIALS_V1), 1);
            }
            _ => {
                assert!(credentials.is_ok());
                assert_eq!(fetcher.calls_for(CREDENTIALS_V1), 0);
            }
        }
    }
}

#[tokio::test]
async fn concurrent_resolves_fetch_each_url_once() {
    init_tracing();
    let fetcher = Arc::new(CountingFetcher::default());
    let loader = Arc::new(CacheOnFirstCallLoader::new(fetcher.clone(), Vec::new()));

    let mut handles = Vec::new();
    for i in 0..20 {
        let loader = Arc::clone(&loader);
        handles.push(tokio::spawn(async move {
            let url = format!("https://example.com/ctx/{}", i % 2);
            loader.resolve(&url).await
        }));
    }
    for h in handles {
        let doc = h.await.unwrap().unwrap();
        assert!(doc.document_url.starts_with("https://example.com/ctx/"));
    }
    assert_eq!(fetcher.calls_for("https://example.com/ctx/0"), 1);
    assert_eq!(fetcher.calls_for("https://example.com/ctx/1"), 1);
}

#[tokio::test]
async fn first_call_preloads_every_well_known_url() {
    init_tracing();
    let fetcher = Arc::new(CountingFetcher::default());
    let well_known = vec![
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
        "https://example.com/c".to_string(),
    ];
    let loader = CacheOnFirstCallLoader::new(fetcher.clone(), well_known.clone());

    loader.resolve("https://example.com/a").await.unwrap();
    // `b` and `c` were started by the preload; resolving joins those fetches.
    loader.resolve("https://example.com/b").await.unwrap();
    loader.resolve("https://example.com/c").await.unwrap();
    loader.resolve("https://example.com/a").await.unwrap();

    for url in &well_known {
        assert_eq!(fetcher.calls_for(url), 1, "{url}");
        assert_eq!(loader.cache().state(url), Some(SlotState::Resolved));
    }
    assert_eq!(fetcher.total.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_fetch_is_reported_to_every_caller() {
    init_tracing();
    let fetcher = Arc::new(CountingFetcher::default());
    let loader = CacheOnFirstCallLoader::new(fetcher.clone(), Vec::new());

    for _ in 0..3 {
        let err = loader.resolve("https://example.com/broken").await.unwrap_err();
        assert!(matches!(err, ContextError::ResolutionFailed { .. }));
    }
    assert_eq!(fetcher.calls_for("https://example.com/broken"), 1);
}

#[tokio::test]
async fn http_fetcher_sends_accept_header_and_parses_json() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contexts/custom.json"))
        .and(|req: &Request| {
            req.headers.get("accept").and_then(|v| v.to_str().ok()) == Some(CONTEXT_ACCEPT)
        })
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"@context": {"reference": "ex:ref"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpContextFetcher::new(Duration::from_secs(5)).unwrap();
    let doc = fetcher
        .fetch(&format!("{}/contexts/custom.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(doc["@context"]["reference"], "ex:ref");
}

#[tokio::test]
async fn http_fetcher_maps_status_and_parse_errors() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let fetcher = HttpContextFetcher::new(Duration::from_secs(5)).unwrap();
    let missing = fetcher.fetch(&format!("{}/missing", server.uri())).await;
    assert!(matches!(missing, Err(FetchError::Status { status: 404, .. })));
    let garbage = fetcher.fetch(&format!("{}/garbage", server.uri())).await;
    assert!(matches!(garbage, Err(FetchError::Parse { .. })));
}

#[tokio::test]
async fn cache_on_first_call_over_http() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ctx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"@context": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Arc::new(HttpContextFetcher::new(Duration::from_secs(5)).unwrap());
    let loader = CacheOnFirstCallLoader::new(fetcher, Vec::new());
    let url = format!("{}/ctx", server.uri());
    for _ in 0..3 {
        loader.resolve(&url).await.unwrap();
    }
}

#[tokio::test]
async fn local_first_prefers_disk_then_falls_back() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("example.com").join("ctx");
    std::fs::create_dir_all(&local).unwrap();
    std::fs::write(local.join("local.json"), r#"{"@context": {"onDisk": "ex:d"}}"#).unwrap();

    let fetcher = Arc::new(CountingFetcher::default());
    let loader = LocalFirstLoader::new(dir.path()).with_fetcher(fetcher.clone());

    let doc = loader.resolve("https://example.com/ctx/local.json").await.unwrap();
    assert_eq!(doc.document["@context"]["onDisk"], "ex:d");
    assert_eq!(fetcher.calls_for("https://example.com/ctx/local.json"), 0);

    let doc = loader.resolve("https://example.com/ctx/remote.json").await.unwrap();
    assert!(doc.document["@context"].get("https://example.com/ctx/remote.json").is_some());
    loader.resolve("https://example.com/ctx/remote.json").await.unwrap();
    assert_eq!(fetcher.calls_for("https://example.com/ctx/remote.json"), 1);
}

#[tokio::test]
async fn local_first_without_network_reports_missing_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let loader = LocalFirstLoader::new(dir.path());
    let err = loader.resolve("https://example.com/none.json").await.unwrap_err();
    match err {
        ContextError::ResolutionFailed { source, .. } => {
            assert!(matches!(*source, FetchError::Io { .. }));
        }
        other => panic!("expected ResolutionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn local_first_rejects_invalid_json_on_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("example.com")).unwrap();
    std::fs::write(dir.path().join("example.com").join("bad.json"), "{ nope").unwrap();
    let loader = LocalFirstLoader::new(dir.path());
    let err = loader.resolve("https://example.com/bad.json").await.unwrap_err();
    assert!(err.to_string().contains("not valid JSON"));
}
