//! Application state and router assembly.

use axum::{
    http::StatusCode,
    routing::{get, get_service, post},
    Extension, Router,
};
use std::{env, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::warn;

use crate::db::store::AccountStore;
use crate::handlers::accounts::list_accounts_handler;
use crate::handlers::register::register_handler;
use crate::utils::hashing::CredentialHasher;
use crate::utils::metrics;
use crate::utils::whatsapp::Notifier;

/// Shared application dependencies, constructed once at startup.
///
/// The pipeline only sees the `AccountStore`, `CredentialHasher`, and
/// `Notifier` traits, so each collaborator can be swapped (or faked in
/// tests) without touching orchestration logic.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub hasher: Arc<dyn CredentialHasher>,
}

/// Builds the Axum application with all routes and middleware.
///
/// The account listing route is a development aid and is only mounted when
/// `ENABLE_DEBUG_ROUTES=true`; it must never be exposed in production.
pub async fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/register", post(register_handler))
        .route("/metrics", get(metrics_handler));

    if debug_routes_enabled() {
        warn!("Debug routes enabled: mounting GET /api/users");
        router = router.route("/api/users", get(list_accounts_handler));
    }

    router
        // Registration form and its client-side validation script
        .fallback_service(
            get_service(ServeDir::new("public")).handle_error(|error: std::io::Error| async move {
                warn!(error = %error, "Static file serving failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Static file error")
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any),
        )
        .layer(Extension(state))
}

fn debug_routes_enabled() -> bool {
    env::var("ENABLE_DEBUG_ROUTES")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Prometheus text exposition endpoint.
async fn metrics_handler() -> (StatusCode, String) {
    (StatusCode::OK, metrics::render())
}
