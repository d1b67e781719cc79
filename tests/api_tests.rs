use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use knowbase::clock::{Clock, ManualClock};
use knowbase::config::Config;
use knowbase::db::Store;
use knowbase::domain::{ProviderName, Query, ResultItem};
use knowbase::email::{EmailError, EmailMessage, Mailer};
use knowbase::services::{CacheStore, ProviderError, SearchProvider};
use knowbase::state::SharedState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

struct StubProvider {
    name: ProviderName,
    titles: Vec<&'static str>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new(name: ProviderName, titles: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            name,
            titles,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: ProviderName) -> Arc<Self> {
        Arc::new(Self {
            name,
            titles: vec![],
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchProvider for StubProvider {
    fn name(&self) -> ProviderName {
        self.name
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<ResultItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::status(self.name, 503));
        }
        Ok(self
            .titles
            .iter()
            .enumerate()
            .map(|(i, title)| ResultItem {
                title: format!("{title} {query}"),
                link: format!("https://example.com/{}/{i}", self.name),
                score: i64::try_from(i).unwrap(),
                body: None,
                created_at: None,
                author: None,
                tags: vec![],
                responses: None,
            })
            .collect())
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    fn sender(&self) -> &str {
        "kb@example.com"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    so: Arc<StubProvider>,
    reddit: Arc<StubProvider>,
    mailer: Arc<RecordingMailer>,
    clock: Arc<ManualClock>,
    cache: Arc<dyn CacheStore>,
}

async fn spawn_app_with(so: Arc<StubProvider>, reddit: Arc<StubProvider>) -> TestApp {
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory database");

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache: Arc<dyn CacheStore> = Arc::new(store.cache_store(clock.clone()));
    let mailer = Arc::new(RecordingMailer::default());

    let providers: Vec<Arc<dyn SearchProvider>> = vec![so.clone(), reddit.clone()];
    let shared = SharedState::from_parts(
        Config::default(),
        clock.clone() as Arc<dyn Clock>,
        cache.clone(),
        providers,
        mailer.clone(),
    )
    .expect("Failed to build state");

    let state = knowbase::api::create_app_state(Arc::new(shared), None);

    TestApp {
        router: knowbase::api::router(state),
        so,
        reddit,
        mailer,
        clock,
        cache,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(
        StubProvider::new(ProviderName::StackOverflow, vec!["so-a", "so-b", "so-c"]),
        StubProvider::new(ProviderName::Reddit, vec!["rd-a"]),
    )
    .await
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_search_miss_then_hit() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/search", serde_json::json!({"query": "Python"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let first = read_json(response).await;
    assert_eq!(first["success"], true);
    let so = first["data"]["stackoverflow"].as_array().unwrap();
    assert_eq!(so.len(), 3);
    assert_eq!(so[0]["title"], "so-a python");
    assert_eq!(so[2]["title"], "so-c python");
    assert_eq!(first["data"]["reddit"].as_array().unwrap().len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/search", serde_json::json!({"query": "  python "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = read_json(response).await;

    assert_eq!(first, second);
    assert_eq!(app.so.calls(), 1);
    assert_eq!(app.reddit.calls(), 1);

    let entry = app
        .cache
        .get(&Query::parse("python").unwrap())
        .await
        .unwrap()
        .expect("cached under normalized key");
    assert_eq!(entry.value.total(), 4);
}

#[tokio::test]
async fn test_search_refetches_after_expiry() {
    let app = spawn_app().await;

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/search", serde_json::json!({"query": "rust"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(app.so.calls(), 1);

    app.clock.advance(chrono::Duration::minutes(61));

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/search", serde_json::json!({"query": "rust"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.so.calls(), 2);
    assert_eq!(app.reddit.calls(), 2);
}

#[tokio::test]
async fn test_search_get_endpoint() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/search?q=Borrow%20Checker")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["data"]["reddit"][0]["title"], "rd-a borrow checker");
}

#[tokio::test]
async fn test_search_rejects_blank_query() {
    let app = spawn_app().await;

    for body in [
        serde_json::json!({"query": ""}),
        serde_json::json!({"query": "   "}),
        serde_json::json!({}),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/search", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = read_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid search query");
    }

    assert_eq!(app.so.calls() + app.reddit.calls(), 0);
}

#[tokio::test]
async fn test_search_rejects_non_string_query() {
    let app = spawn_app().await;

    for body in [
        serde_json::json!({"query": 123}),
        serde_json::json!({"query": ["a"]}),
        serde_json::json!({"query": {"text": "rust"}}),
        serde_json::json!([]),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/search", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = read_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid search query");
    }

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/search")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"query\":"))
        .unwrap();
    let response = app.router.clone().oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Invalid search query");

    assert_eq!(app.so.calls() + app.reddit.calls(), 0);
}

#[tokio::test]
async fn test_search_provider_failure_is_not_cached() {
    let app = spawn_app_with(
        StubProvider::new(ProviderName::StackOverflow, vec!["so-a"]),
        StubProvider::failing(ProviderName::Reddit),
    )
    .await;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/search", serde_json::json!({"query": "python"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    // No upstream detail leaks into the body.
    assert!(!json["error"].as_str().unwrap().contains("503"));

    assert!(
        app.cache
            .get(&Query::parse("python").unwrap())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_email_results_sends_rendered_message() {
    let app = spawn_app().await;

    let body = serde_json::json!({
        "email": "reader@example.com",
        "query": "rust",
        "results": {
            "stackoverflow": [{"title": "Lifetimes <explained>", "link": "https://stackoverflow.com/q/1", "score": 9}],
            "reddit": [{"title": "Why Rust", "link": "https://reddit.com/r/rust/1", "score": 3}]
        }
    });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/email-results", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["message"], "Email sent successfully");

    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "reader@example.com");
    assert_eq!(sent[0].from, "kb@example.com");
    assert_eq!(sent[0].subject, "Knowledge Base Search Results: rust");
    assert!(sent[0].html.contains("Lifetimes &lt;explained&gt;"));
    assert!(sent[0].html.contains("Why Rust"));
}

#[tokio::test]
async fn test_email_results_rejects_incomplete_results() {
    let app = spawn_app().await;

    let body = serde_json::json!({
        "email": "reader@example.com",
        "query": "rust",
        "results": {"stackoverflow": []}
    });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/email-results", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = read_json(response).await;
    assert_eq!(json["error"], "Invalid results format");
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_email_results_rejects_bad_address() {
    let app = spawn_app().await;

    let body = serde_json::json!({
        "email": "not-an-address",
        "query": "rust",
        "results": {"stackoverflow": [], "reddit": []}
    });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/email-results", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_system_status() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["data"]["cache_backend"], "sqlite");
    assert_eq!(json["data"]["cache_reachable"], true);
    assert_eq!(json["data"]["cache_ttl_seconds"], 3600);
    assert_eq!(
        json["data"]["providers"],
        serde_json::json!(["stackoverflow", "reddit"])
    );
}

#[tokio::test]
async fn test_health_and_metrics_without_recorder() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("Metrics not enabled"));
}

#[tokio::test]
async fn test_email_results_rejects_non_string_fields() {
    let app = spawn_app().await;
    let results = serde_json::json!({"stackoverflow": [], "reddit": []});

    let cases = [
        (
            serde_json::json!({"email": 42, "query": "rust", "results": results}),
            "Email address is required",
        ),
        (
            serde_json::json!({"email": "reader@example.com", "query": ["rust"], "results": results}),
            "Invalid search query",
        ),
    ];

    for (body, expected) in cases {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/email-results", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = read_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], expected);
    }

    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_email_results_ignores_unknown_provider_lists() {
    let app = spawn_app().await;

    let body = serde_json::json!({
        "email": "reader@example.com",
        "query": "rust",
        "results": {
            "stackoverflow": [{"title": "Pinning", "link": "https://stackoverflow.com/q/2", "score": 4}],
            "reddit": [],
            "github": [{"name": "tokio"}]
        }
    });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/email-results", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains("Pinning"));
    assert!(!sent[0].html.contains("tokio"));
}
