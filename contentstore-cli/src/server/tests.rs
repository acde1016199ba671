use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use contentstore_lib::Notification;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use super::build_router;
use super::config::ContentServerConfig;
use super::content::ContentStore;
use super::notify::{Notifier, NotifyError};
use super::routes::OUTCOME_HEADER;
use super::state::AppState;
use super::store::memory::MemoryStore;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Status(502));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

fn app_with(config: ContentServerConfig, notifier: Arc<RecordingNotifier>) -> Router {
    let state = AppState::new(
        ContentStore::new(Arc::new(MemoryStore::new())),
        Arc::new(config),
        notifier,
    );
    build_router(Arc::new(state))
}

fn app() -> (Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    (
        app_with(ContentServerConfig::default(), Arc::clone(&notifier)),
        notifier,
    )
}

const TOKEN: &str = "s3cret";
const AUTH: (&str, &str) = ("authorization", "Bearer s3cret");

fn guarded_config() -> ContentServerConfig {
    let mut config = ContentServerConfig::default();
    config.admin.tokens = vec![TOKEN.into()];
    config
}

fn guarded_app() -> (Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    (app_with(guarded_config(), Arc::clone(&notifier)), notifier)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, value)
}

fn outcome(headers: &HeaderMap) -> &str {
    headers
        .get(OUTCOME_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_quote_lifecycle() {
    let (app, _) = app();

    let (status, headers, body) = call(
        &app,
        Method::POST,
        "/api/resources/quotes",
        Some(json!({"id": "q1", "email": "a@b.com"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(outcome(&headers), "created");

    let (status, _, list) = call(&app, Method::GET, "/api/resources/quotes", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], json!("q1"));
    assert_eq!(list[0]["email"], json!("a@b.com"));
    assert!(list[0]["createdAt"].is_number());

    let (status, _, _) = call(
        &app,
        Method::DELETE,
        "/api/resources/quotes",
        Some(json!({"id": "q1"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, list) = call(&app, Method::GET, "/api/resources/quotes", None, &[]).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_update_merges_and_upserts() {
    let (app, _) = app();
    let uri = "/api/resources/products";

    call(&app, Method::POST, uri, Some(json!({"id": "x", "a": 1, "b": 2})), &[]).await;
    let (status, headers, body) =
        call(&app, Method::PUT, uri, Some(json!({"id": "x", "b": 3})), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(outcome(&headers), "updated");

    let (_, headers, body) =
        call(&app, Method::PUT, uri, Some(json!({"id": "y", "a": 9})), &[]).await;
    assert_eq!(body, json!({"success": true}));
    assert_eq!(outcome(&headers), "inserted");

    let (_, _, list) = call(&app, Method::GET, uri, None, &[]).await;
    assert_eq!(list[0]["a"], json!(1));
    assert_eq!(list[0]["b"], json!(3));
    assert!(list[0]["updatedAt"].is_number());
    assert_eq!(list[1]["id"], json!("y"));
    assert!(list[1].get("updatedAt").is_none());
}

#[tokio::test]
async fn test_update_without_id_is_rejected() {
    let (app, _) = app();
    let (status, _, body) = call(
        &app,
        Method::PUT,
        "/api/resources/blog",
        Some(json!({"title": "orphan"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "id is required"}));

    let (status, _, body) = call(
        &app,
        Method::DELETE,
        "/api/resources/blog",
        Some(json!({})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "id is required"}));
}

#[tokio::test]
async fn test_delete_matches_slug_and_path_id() {
    let (app, _) = app();
    let uri = "/api/resources/blog";
    call(&app, Method::POST, uri, Some(json!({"id": "x", "slug": "y"})), &[]).await;
    call(&app, Method::POST, uri, Some(json!({"id": "z"})), &[]).await;

    let (status, headers, body) =
        call(&app, Method::DELETE, uri, Some(json!({"id": "nothing"})), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(outcome(&headers), "not-found");

    let (_, headers, _) = call(&app, Method::DELETE, uri, Some(json!({"id": "y"})), &[]).await;
    assert_eq!(outcome(&headers), "deleted");

    let (_, headers, _) = call(&app, Method::DELETE, "/api/resources/blog/z", None, &[]).await;
    assert_eq!(outcome(&headers), "deleted");

    let (_, _, list) = call(&app, Method::GET, uri, None, &[]).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_list_applies_language_fallback() {
    let (app, _) = app();
    let uri = "/api/resources/hero";
    call(
        &app,
        Method::POST,
        uri,
        Some(json!({"id": "h1", "title_fr": "Bonjour", "title_en": "Hello"})),
        &[],
    )
    .await;

    let (_, _, default) = call(&app, Method::GET, uri, None, &[]).await;
    assert_eq!(default[0]["title"], json!("Hello"));

    let (_, _, fr) = call(&app, Method::GET, "/api/resources/hero?lang=fr", None, &[]).await;
    assert_eq!(fr[0]["title"], json!("Bonjour"));
    assert_eq!(fr[0]["title_en"], json!("Hello"));

    let (_, _, es) = call(&app, Method::GET, "/api/resources/hero?lang=es", None, &[]).await;
    assert_eq!(es[0]["title"], json!("Hello"));

    // resolution is never persisted
    let (_, _, again) = call(&app, Method::GET, "/api/resources/hero?lang=fr", None, &[]).await;
    assert_eq!(again[0]["title"], json!("Bonjour"));
}

#[tokio::test]
async fn test_public_content_route() {
    let (app, _) = app();
    call(
        &app,
        Method::POST,
        "/api/resources/products",
        Some(json!({"id": "p1", "name_nl": "Thuisbatterij"})),
        &[],
    )
    .await;
    let (status, _, list) =
        call(&app, Method::GET, "/api/content/products?lang=nl", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["name"], json!("Thuisbatterij"));

    let (status, _, _) = call(&app, Method::GET, "/api/content/quote_requests", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, list) = call(&app, Method::POST, "/api/content/products", None, &[]).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_ne!(list, json!({"success": true}));
}

#[tokio::test]
async fn test_never_written_resource_is_empty() {
    let (app, _) = app();
    let (status, _, list) = call(&app, Method::GET, "/api/resources/faq", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_invalid_resource_name() {
    let (app, _) = app();
    let (status, _, body) =
        call(&app, Method::GET, "/api/resources/..%2Fsecrets", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid resource name"));
}

#[tokio::test]
async fn test_admin_tokens() {
    let app = app_with(guarded_config(), Arc::new(RecordingNotifier::default()));

    let (status, _, _) = call(
        &app,
        Method::POST,
        "/api/resources/blog",
        Some(json!({"id": "b1"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = call(
        &app,
        Method::POST,
        "/api/resources/blog",
        Some(json!({"id": "b1"})),
        &[AUTH],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // public reads and forms stay open
    let (status, _, _) = call(&app, Method::GET, "/api/content/blog", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = call(
        &app,
        Method::POST,
        "/api/forms/newsletter",
        Some(json!({"email": "a@b.com"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_open_admin_hides_submissions() {
    let (app, _) = app();
    let (status, _, _) = call(
        &app,
        Method::POST,
        "/api/forms/contact",
        Some(json!({"name": "Ada", "email": "ada@example.com", "phone": "+32 555", "message": "private"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for resource in ["contact_submissions", "quote_requests", "newsletter_subscribers"] {
        let uri = format!("/api/resources/{}", resource);
        let (status, _, body) = call(&app, Method::GET, &uri, None, &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!body.to_string().contains("ada@example.com"));

        let (status, _, _) =
            call(&app, Method::POST, &uri, Some(json!({"id": "forged"})), &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) =
            call(&app, Method::PUT, &uri, Some(json!({"id": "forged"})), &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) =
            call(&app, Method::DELETE, &uri, Some(json!({"id": "forged"})), &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) =
            call(&app, Method::DELETE, &format!("{}/forged", uri), None, &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // percent-encoding does not get around the check
    let (status, _, _) = call(
        &app,
        Method::GET,
        "/api/resources/contact%5Fsubmissions",
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submissions_never_public() {
    let mut config = guarded_config();
    config.content.public_resources.push("contact_submissions".into());
    let app = app_with(config, Arc::new(RecordingNotifier::default()));
    let (status, _, _) =
        call(&app, Method::GET, "/api/content/contact_submissions", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resource_listing() {
    let (app, _) = app();
    call(&app, Method::POST, "/api/resources/blog", Some(json!({"id": 1})), &[]).await;
    call(&app, Method::POST, "/api/resources/hero", Some(json!({"id": 2})), &[]).await;
    let (_, _, body) = call(&app, Method::GET, "/api/resources", None, &[]).await;
    assert_eq!(body, json!({"resources": ["blog", "hero"]}));
}

#[tokio::test]
async fn test_contact_form_persists_and_notifies() {
    let (app, notifier) = guarded_app();
    let (status, _, body) = call(
        &app,
        Method::POST,
        "/api/forms/contact",
        Some(json!({"name": "Ada", "email": "ada@example.com", "message": "Call me"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["notified"], json!(true));
    let id = body["id"].as_str().unwrap().to_string();

    let (_, _, stored) = call(
        &app,
        Method::GET,
        "/api/resources/contact_submissions",
        None,
        &[AUTH],
    )
    .await;
    assert_eq!(stored[0]["id"], json!(id));
    assert_eq!(stored[0]["message"], json!("Call me"));
    assert!(stored[0]["createdAt"].is_number());

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New contact submission");
    assert!(sent[0].body.contains("Message: Call me"));
}

#[tokio::test]
async fn test_form_validation_errors() {
    let (app, notifier) = guarded_app();
    let (status, _, body) = call(
        &app,
        Method::POST,
        "/api/forms/quote",
        Some(json!({"name": "Bo", "email": "nope", "quantity": -2})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Validation failed"));
    assert_eq!(
        body["errors"],
        json!([
            {"field": "email", "message": "must be a valid email address"},
            {"field": "product", "message": "is required"},
            {"field": "quantity", "message": "must be a non-negative integer"}
        ])
    );
    assert!(notifier.sent.lock().await.is_empty());

    let (_, _, stored) =
        call(&app, Method::GET, "/api/resources/quote_requests", None, &[AUTH]).await;
    assert_eq!(stored, json!([]));
}

#[tokio::test]
async fn test_form_rejects_malformed_json() {
    let (app, _) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/forms/contact")
        .header("content-type", "application/json")
        .body(Body::from("{name:"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["errors"][0]["field"], json!("body"));
}

#[tokio::test]
async fn test_notification_failure_keeps_submission() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..Default::default()
    });
    let app = app_with(guarded_config(), notifier);

    let (status, _, body) = call(
        &app,
        Method::POST,
        "/api/forms/quote",
        Some(json!({"name": "Bo", "email": "bo@x.io", "product": "Home battery 10kWh"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notified"], json!(false));

    let (_, _, stored) =
        call(&app, Method::GET, "/api/resources/quote_requests", None, &[AUTH]).await;
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["id"], body["id"]);
}

#[tokio::test]
async fn test_newsletter_resubscribe_does_not_duplicate() {
    let (app, _) = guarded_app();
    for name in ["Ann", "Annie"] {
        let (status, _, _) = call(
            &app,
            Method::POST,
            "/api/forms/newsletter",
            Some(json!({"email": "ann@example.com", "name": name})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, _, stored) = call(
        &app,
        Method::GET,
        "/api/resources/newsletter_subscribers",
        None,
        &[AUTH],
    )
    .await;
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["name"], json!("Annie"));
}

#[tokio::test]
async fn test_preflight_is_empty_ok() {
    let (app, _) = app();
    for form in ["contact", "newsletter", "quote"] {
        let uri = format!("/api/forms/{}", form);
        let (status, _, body) = call(&app, Method::OPTIONS, &uri, None, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);

        let (status, headers, body) = call(
            &app,
            Method::OPTIONS,
            &uri,
            None,
            &[
                ("origin", "https://www.example.com"),
                ("access-control-request-method", "POST"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
        assert!(headers.contains_key("access-control-allow-origin"));
    }
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, _) = app();
    let (status, _, body) = call(&app, Method::GET, "/health", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, _, body) = call(&app, Method::GET, "/readyz", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], json!("memory"));

    call(&app, Method::GET, "/api/resources/blog", None, &[]).await;
    let (status, _, body) = call(&app, Method::GET, "/metrics", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_str()
        .unwrap()
        .contains("contentstore_http_requests_total"));
}
