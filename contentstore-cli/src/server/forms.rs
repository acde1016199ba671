use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contentstore_lib::forms::{self, FieldError, FormKind};
use contentstore_lib::record::now_millis;
use contentstore_lib::ResourceName;
use serde_json::Value;

use super::metrics::metrics;
use super::routes::internal_error;
use super::state::AppState;

pub async fn handle_contact(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    submit(&state, FormKind::Contact, &body).await
}

pub async fn handle_newsletter(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    submit(&state, FormKind::Newsletter, &body).await
}

pub async fn handle_quote(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    submit(&state, FormKind::Quote, &body).await
}

/// OPTIONS preflight: always 200 with an empty body.
pub async fn handle_preflight() -> StatusCode {
    StatusCode::OK
}

fn validation_failed(errors: Vec<FieldError>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "Validation failed",
            "errors": errors,
        })),
    )
        .into_response()
}

/// Validate, persist, then notify.
///
/// A failed notification does not undo or fail the submission; the
/// response reports it through `notified`.
async fn submit(state: &AppState, kind: FormKind, body: &[u8]) -> Response {
    let form = kind.as_str();

    let payload: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => {
            metrics().form_submissions.with_label_values(&[form, "invalid"]).inc();
            return validation_failed(vec![FieldError {
                field: "body".into(),
                message: "must be valid JSON".into(),
            }]);
        }
    };

    let fields = match forms::validate(kind, &payload, state.localizer.languages()) {
        Ok(fields) => fields,
        Err(errors) => {
            tracing::debug!(form, errors = errors.len(), "form submission rejected");
            metrics().form_submissions.with_label_values(&[form, "invalid"]).inc();
            return validation_failed(errors);
        }
    };

    let resource = match ResourceName::parse(kind.resource()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(form, error = %e, "invalid submission resource");
            return internal_error();
        }
    };

    let now = now_millis();
    let stored = match state
        .store
        .mutate(&resource, |records| forms::store_submission(kind, records, fields, now))
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!(form, error = %e, "failed to persist form submission");
            metrics().form_submissions.with_label_values(&[form, "error"]).inc();
            return internal_error();
        }
    };

    let notification = forms::render_notification(kind, &stored.record);
    let notified = match state.notifier.notify(&notification).await {
        Ok(()) => {
            metrics().notifications.with_label_values(&["ok"]).inc();
            true
        }
        Err(e) => {
            tracing::warn!(form, id = %stored.id, error = %e, "notification failed, submission kept");
            metrics().notifications.with_label_values(&["error"]).inc();
            false
        }
    };

    tracing::info!(form, id = %stored.id, outcome = %stored.outcome, "form submission accepted");
    metrics().form_submissions.with_label_values(&[form, "accepted"]).inc();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "id": stored.id,
            "notified": notified,
        })),
    )
        .into_response()
}
