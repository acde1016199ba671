use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contentstore_lib::FormKind;

use super::config::AdminConfig;
use super::state::AppState;

/// Check a bearer token against the configured admin tokens.
/// Returns true if no tokens are configured (open admin API).
pub fn check_token(admin: &AdminConfig, token: Option<&str>) -> bool {
    if admin.tokens.is_empty() {
        return true;
    }

    let Some(token) = token else { return false };
    admin.tokens.iter().any(|t| t == token)
}

/// Extract bearer token from Authorization header value.
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}

fn get_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
}

/// Return 401 Unauthorized response.
pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

/// True for the resources that hold form submissions.
pub fn is_submission_resource(resource: &str) -> bool {
    FormKind::ALL.iter().any(|kind| kind.resource() == resource)
}

/// Submissions carry personal data, so an open admin API never serves them.
pub fn resource_allowed(admin: &AdminConfig, resource: &str) -> bool {
    !admin.tokens.is_empty() || !is_submission_resource(resource)
}

/// Return 403 for submission resources on an admin API without tokens.
pub fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({
            "error": "form submissions require configured admin tokens"
        })),
    )
        .into_response()
}

/// Middleware guarding the admin resource routes.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !check_token(&state.config.admin, get_token(request.headers())) {
        tracing::debug!(path = %request.uri().path(), "rejected admin request");
        return unauthorized();
    }
    next.run(request).await
}
