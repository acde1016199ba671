pub mod auth;
pub mod config;
pub mod content;
mod forms;
pub mod metrics;
pub mod notify;
mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
mod tests;

use std::process;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use self::auth::require_admin;
use self::config::{ContentServerConfig, StorageBackend};
use self::content::ContentStore;
use self::forms::{handle_contact, handle_newsletter, handle_preflight, handle_quote};
use self::metrics::{handle_health_check, handle_metrics, handle_readyz, track_metrics};
use self::notify::build_notifier;
use self::routes::{
    handle_create, handle_delete, handle_delete_by_path, handle_list, handle_list_resources,
    handle_public_list, handle_update,
};
use self::state::AppState;
use self::store::open_backend;

/// Command-line values that take precedence over config file and env vars.
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub hostname: Option<String>,
    pub content_dir: Option<String>,
    pub storage: Option<StorageBackend>,
}

impl ServeOverrides {
    fn apply(self, config: &mut ContentServerConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(hostname) = self.hostname {
            config.server.hostname = hostname;
        }
        if let Some(dir) = self.content_dir {
            config.server.content_dir = dir;
        }
        if let Some(storage) = self.storage {
            config.server.storage = storage;
        }
    }
}

/// Assemble the full HTTP surface around a prepared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/resources", get(handle_list_resources))
        .route(
            "/api/resources/{resource}",
            get(handle_list)
                .post(handle_create)
                .put(handle_update)
                .delete(handle_delete),
        )
        .route("/api/resources/{resource}/{id}", delete(handle_delete_by_path))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_admin,
        ));

    let forms = Router::new()
        .route(
            "/api/forms/contact",
            post(handle_contact).options(handle_preflight),
        )
        .route(
            "/api/forms/newsletter",
            post(handle_newsletter).options(handle_preflight),
        )
        .route(
            "/api/forms/quote",
            post(handle_quote).options(handle_preflight),
        )
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(handle_health_check))
        .route("/readyz", get(handle_readyz))
        .route("/metrics", get(handle_metrics))
        .route("/api/content/{resource}", get(handle_public_list))
        .merge(admin)
        .merge(forms)
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

pub async fn run_serve(config_path: &str, overrides: ServeOverrides) {
    // File < env vars < command line
    let mut config = ContentServerConfig::load(config_path);
    config.apply_env_overrides();
    overrides.apply(&mut config);

    let backend = open_backend(&config.server).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to open storage backend");
        process::exit(1);
    });
    let notifier = build_notifier(&config.forms).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to configure notifier");
        process::exit(1);
    });

    let addr = format!("{}:{}", config.server.hostname, config.server.port);
    tracing::info!(
        backend = backend.kind(),
        content_dir = %config.server.content_dir,
        admin_auth = !config.admin.tokens.is_empty(),
        "serving content on http://{}",
        addr
    );

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(
        ContentStore::new(backend),
        Arc::clone(&config),
        notifier,
    ));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "server error");
            process::exit(1);
        });

    tracing::info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, finishing in-flight requests");
}
