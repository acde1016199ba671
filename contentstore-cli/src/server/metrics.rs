use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::state::AppState;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// All application metrics
pub struct Metrics {
    // Content store
    pub store_ops: IntCounterVec,
    pub read_anomalies: IntCounterVec,
    pub store_write_duration: HistogramVec,

    // Form intake
    pub form_submissions: IntCounterVec,
    pub notifications: IntCounterVec,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

impl Metrics {
    fn new(registry: &Registry) -> Self {
        // ── Content store metrics ────────────────────────────────────
        let store_ops = IntCounterVec::new(
            Opts::new(
                "contentstore_store_ops_total",
                "Content store mutations by resource, operation and outcome",
            ),
            &["resource", "op", "outcome"],
        )
        .expect("failed to create store_ops metric");

        let read_anomalies = IntCounterVec::new(
            Opts::new(
                "contentstore_read_anomalies_total",
                "Resource reads downgraded to an empty collection",
            ),
            &["resource"],
        )
        .expect("failed to create read_anomalies metric");

        let store_write_duration = HistogramVec::new(
            HistogramOpts::new(
                "contentstore_store_write_duration_seconds",
                "Time to persist a resource",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["backend"],
        )
        .expect("failed to create store_write_duration metric");

        // ── Form intake metrics ──────────────────────────────────────
        let form_submissions = IntCounterVec::new(
            Opts::new(
                "contentstore_form_submissions_total",
                "Form submissions by form and outcome",
            ),
            &["form", "outcome"],
        )
        .expect("failed to create form_submissions metric");

        let notifications = IntCounterVec::new(
            Opts::new(
                "contentstore_notifications_total",
                "Notification dispatch attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("failed to create notifications metric");

        // ── HTTP metrics ─────────────────────────────────────────────
        let http_requests_total = IntCounterVec::new(
            Opts::new("contentstore_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("failed to create http_requests_total metric");

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "contentstore_http_request_duration_seconds",
                "HTTP request duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["method", "path"],
        )
        .expect("failed to create http_request_duration metric");

        registry.register(Box::new(store_ops.clone())).ok();
        registry.register(Box::new(read_anomalies.clone())).ok();
        registry.register(Box::new(store_write_duration.clone())).ok();
        registry.register(Box::new(form_submissions.clone())).ok();
        registry.register(Box::new(notifications.clone())).ok();
        registry.register(Box::new(http_requests_total.clone())).ok();
        registry.register(Box::new(http_request_duration.clone())).ok();

        Self {
            store_ops,
            read_anomalies,
            store_write_duration,
            form_submissions,
            notifications,
            http_requests_total,
            http_request_duration,
        }
    }
}

/// Get the global metrics instance, initializing on first call
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let registry = REGISTRY.get_or_init(Registry::new);
        Metrics::new(registry)
    })
}

/// Axum handler for GET /metrics, in Prometheus text format
pub async fn handle_metrics() -> Response {
    // Ensure all metric collectors are registered on first call.
    let _ = metrics();
    let registry = REGISTRY.get_or_init(Registry::new);
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Axum handler for GET /readyz
///
/// Ready once the storage backend answers a listing.
pub async fn handle_readyz(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Response {
    match state.store.list_resources().await {
        Ok(resources) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "ready": true,
                "backend": state.store.backend_kind(),
                "resources": resources.len(),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(serde_json::json!({
                    "ready": false,
                    "backend": state.store.backend_kind(),
                    "reason": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Axum middleware that records HTTP request count and duration.
pub async fn track_metrics(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let m = metrics();
    m.http_requests_total
        .with_label_values(&[&method, &path, &status])
        .inc();
    m.http_request_duration
        .with_label_values(&[&method, &path])
        .observe(elapsed);

    response
}

/// Axum handler for GET /health, always 200
pub async fn handle_health_check() -> Response {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({"status": "ok"})),
    )
        .into_response()
}
