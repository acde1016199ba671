use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contentstore_lib::{Outcome, Record, ResourceName};
use serde_json::Value;

use super::auth::{forbidden, is_submission_resource, resource_allowed};
use super::state::AppState;
use super::store::StoreError;

/// Response header carrying the internal mutation outcome.
pub const OUTCOME_HEADER: &str = "x-content-outcome";

#[derive(serde::Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

// ── Helpers ──────────────────────────────────────────────────

pub(super) fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
        .into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message.into()})),
    )
        .into_response()
}

fn parse_resource(name: &str) -> Result<ResourceName, Response> {
    ResourceName::parse(name).map_err(|e| bad_request(format!("invalid resource name: {}", e)))
}

/// Parse a resource name for the admin routes.
fn admin_resource(state: &AppState, name: &str) -> Result<ResourceName, Response> {
    let resource = parse_resource(name)?;
    if !resource_allowed(&state.config.admin, resource.as_str()) {
        tracing::warn!(%resource, "refused submission access on open admin API");
        return Err(forbidden());
    }
    Ok(resource)
}

/// Every mutation answers `{"success": true}`; the outcome only travels in
/// the `x-content-outcome` header.
fn mutation_response(result: Result<Outcome, StoreError>) -> Response {
    match result {
        Ok(outcome) => (
            StatusCode::OK,
            [(OUTCOME_HEADER, outcome.as_str())],
            Json(serde_json::json!({"success": true})),
        )
            .into_response(),
        Err(StoreError::Mutation(e)) => bad_request(e.to_string()),
        Err(_) => internal_error(),
    }
}

async fn localized_list(state: &AppState, resource: &ResourceName, lang: Option<&str>) -> Response {
    let lang = state.language(lang);
    let records = state.store.read(resource).await;
    Json(state.localizer.localize_all(&records, lang)).into_response()
}

// ── GET /api/resources ───────────────────────────────────────

pub async fn handle_list_resources(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_resources().await {
        Ok(resources) => Json(serde_json::json!({ "resources": resources })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list resources");
            internal_error()
        }
    }
}

// ── GET /api/resources/{resource} ────────────────────────────

pub async fn handle_list(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Query(query): Query<LangQuery>,
) -> Response {
    let resource = match admin_resource(&state, &resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    localized_list(&state, &resource, query.lang.as_deref()).await
}

// ── GET /api/content/{resource} ──────────────────────────────

pub async fn handle_public_list(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Query(query): Query<LangQuery>,
) -> Response {
    if !state.config.content.is_public(&resource) || is_submission_resource(&resource) {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "resource not found"})),
        )
            .into_response();
    }
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    localized_list(&state, &resource, query.lang.as_deref()).await
}

// ── POST /api/resources/{resource} ───────────────────────────

pub async fn handle_create(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Json(fields): Json<Record>,
) -> Response {
    let resource = match admin_resource(&state, &resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mutation_response(state.store.create(&resource, fields).await)
}

// ── PUT /api/resources/{resource} ────────────────────────────

pub async fn handle_update(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Json(fields): Json<Record>,
) -> Response {
    let resource = match admin_resource(&state, &resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mutation_response(state.store.update(&resource, fields).await)
}

// ── DELETE /api/resources/{resource} ─────────────────────────

pub async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let resource = match admin_resource(&state, &resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(id) = body.get("id").filter(|v| !v.is_null()) else {
        return bad_request("id is required");
    };
    mutation_response(state.store.remove(&resource, id).await)
}

// ── DELETE /api/resources/{resource}/{id} ────────────────────

pub async fn handle_delete_by_path(
    State(state): State<Arc<AppState>>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let resource = match admin_resource(&state, &resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mutation_response(state.store.remove(&resource, &Value::String(id)).await)
}
