//! End-to-end tests of the HTTP API over an in-memory database.
//!
//! Requests go straight into the router; the feed registrar is a local stub
//! that records calls and can be switched into failure mode.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use publications::api::{self, AppState, ResponseCache};
use publications::config::ServerConfig;
use publications::feeds::{FeedRegistrar, RegistrarError};
use publications::metrics::Metrics;
use publications::service::PublicationService;
use publications::storage::Database;

#[derive(Default)]
struct StubRegistrar {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl StubRegistrar {
    fn record(&self, call: String) -> Result<(), RegistrarError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RegistrarError::Rejected {
                status: 503,
                message: "registrar down".to_string(),
            });
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedRegistrar for StubRegistrar {
    async fn create_feed(&self, id: Uuid, url: &str, lang: &str) -> Result<(), RegistrarError> {
        self.record(format!("create {id} {url} {lang}"))
    }

    async fn update_feed(&self, id: Uuid, url: &str, lang: &str) -> Result<(), RegistrarError> {
        self.record(format!("update {id} {url} {lang}"))
    }

    async fn delete_feed(&self, id: Uuid) -> Result<(), RegistrarError> {
        self.record(format!("delete {id}"))
    }
}

struct TestApp {
    router: Router,
    registrar: Arc<StubRegistrar>,
    db: Database,
}

async fn test_app_with_cache(cache: ResponseCache) -> TestApp {
    let db = Database::open(":memory:").await.unwrap();
    let registrar = Arc::new(StubRegistrar::default());
    let metrics = Arc::new(Metrics::new().unwrap());
    let service = PublicationService::new(Arc::new(db.clone()), registrar.clone())
        .with_metrics(Arc::clone(&metrics));
    let router = api::router(
        AppState::new(service, cache, metrics),
        &ServerConfig::default(),
    );
    TestApp {
        router,
        registrar,
        db,
    }
}

async fn test_app() -> TestApp {
    test_app_with_cache(ResponseCache::disabled()).await
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_publisher(&self, name: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/publishers",
                Some(json!({"name": name, "url": "https://acme.example"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }
}

fn daily(publisher_uuid: &Value) -> Value {
    json!({
        "name": "Daily",
        "description": "desc",
        "language_code": "en",
        "publisher_uuid": publisher_uuid,
        "publication_type": "rss",
        "config": {"url": "https://acme.example/feed.xml"},
    })
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_healthz_on_empty_store() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b".");
}

#[tokio::test]
async fn test_healthz_unavailable_after_close() {
    let app = test_app().await;
    app.db.close().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Publishers
// ============================================================================

#[tokio::test]
async fn test_publisher_crud() {
    let app = test_app().await;
    let created = app.create_publisher("Acme").await;
    let id = created["uuid"].as_str().unwrap().to_string();

    let (status, fetched) = app.send(Method::GET, &format!("/publishers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/publishers/{id}"),
            Some(json!({"name": "Acme Corp", "url": "https://acme.example/new"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["uuid"], created["uuid"]);
    assert_eq!(updated["name"], "Acme Corp");

    let (status, _) = app.send(Method::DELETE, &format!("/publishers/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(Method::GET, &format!("/publishers/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error_text"].is_string());
}

#[tokio::test]
async fn test_publisher_validation_errors() {
    let app = test_app().await;

    let (status, body) = app
        .send(Method::POST, "/publishers", Some(json!({"url": "https://acme.example"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_text"], "missing required 'name' field");

    let (status, body) = app.send(Method::GET, "/publishers/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error_text"].as_str().unwrap().contains("not-a-uuid"));
}

#[tokio::test]
async fn test_body_without_json_content_type() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/publishers")
                .body(Body::from(r#"{"name":"Acme","url":"https://acme.example"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_delete_publisher_with_publications_conflicts() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;
    let (status, _) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = publisher["uuid"].as_str().unwrap();
    let (status, _) = app.send(Method::DELETE, &format!("/publishers/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, publications) = app
        .send(Method::GET, &format!("/publishers/{id}/publications"), None)
        .await;
    assert_eq!(publications.as_array().unwrap().len(), 1);
}

// ============================================================================
// Publications
// ============================================================================

#[tokio::test]
async fn test_create_rss_publication_registers_feed() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;

    let (status, created) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["publication_type"], "rss");
    assert_eq!(created["config"]["url"], "https://acme.example/feed.xml");
    assert_eq!(created["publisher_uuid"], publisher["uuid"]);

    let id = created["uuid"].as_str().unwrap();
    assert_eq!(
        app.registrar.calls(),
        vec![format!("create {id} https://acme.example/feed.xml en")]
    );

    let (status, fetched) = app.send(Method::GET, &format!("/publications/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_failed_registration_rolls_back() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;
    app.registrar.fail.store(true, Ordering::SeqCst);

    let (status, body) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error_text"]
        .as_str()
        .unwrap()
        .contains("registrar down"));

    let (status, list) = app.send(Method::GET, "/publications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_create_publication_rejections() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;

    let mut unknown_type = daily(&publisher["uuid"]);
    unknown_type["publication_type"] = json!("podcast");
    let (status, _) = app.send(Method::POST, "/publications", Some(unknown_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, "/publications", Some(daily(&json!(Uuid::new_v4()))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Only the successful create reached the registrar.
    assert_eq!(app.registrar.calls().len(), 1);
}

#[tokio::test]
async fn test_update_and_delete_publication() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;
    let (_, created) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    let id = created["uuid"].as_str().unwrap().to_string();

    let mut changed = daily(&publisher["uuid"]);
    changed["language_code"] = json!("de");
    changed["description"] = json!("Tagesausgabe");
    let (status, updated) = app
        .send(Method::PUT, &format!("/publications/{id}"), Some(changed))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["language_code"], "de");
    assert_eq!(updated["uuid"], created["uuid"]);

    let (status, _) = app.send(Method::DELETE, &format!("/publications/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::GET, &format!("/publications/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(
        app.registrar.calls(),
        vec![
            format!("create {id} https://acme.example/feed.xml en"),
            format!("update {id} https://acme.example/feed.xml de"),
            format!("delete {id}"),
        ]
    );
}

#[tokio::test]
async fn test_missing_publication_is_not_found() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;
    let id = Uuid::new_v4();

    let (status, _) = app.send(Method::GET, &format!("/publications/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/publications/{id}"),
            Some(daily(&publisher["uuid"])),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(Method::GET, &format!("/publishers/{id}/publications"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// List cache
// ============================================================================

#[tokio::test]
async fn test_writes_invalidate_cached_lists() {
    let app = test_app_with_cache(ResponseCache::new(16, Duration::from_secs(60))).await;

    let (_, empty) = app.send(Method::GET, "/publishers", None).await;
    assert_eq!(empty, json!([]));

    app.create_publisher("Acme").await;
    let (_, list) = app.send(Method::GET, "/publishers", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

// ============================================================================
// Metrics
// ============================================================================

#[tokio::test]
async fn test_metrics_count_requests_and_workflow() {
    let app = test_app().await;
    let publisher = app.create_publisher("Acme").await;
    let (status, _) = app
        .send(Method::POST, "/publications", Some(daily(&publisher["uuid"])))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.send(Method::GET, "/publishers/not-a-uuid", None).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(
        text.contains(r#"publications_http_requests_total{method="POST",status="201"} 2"#),
        "{text}"
    );
    assert!(
        text.contains(r#"publications_http_requests_total{method="GET",status="400"} 1"#),
        "{text}"
    );
    assert!(text.contains("publications_created_total 1"), "{text}");
}
