//! Registration service main entry point.
//!
//! A small user-registration microservice:
//!
//! - **Validation**: fail-fast field checks mirrored by the registration form
//! - **Persistence**: SQLite via Diesel with a pooled `AccountStore`
//! - **Security**: Argon2id password hashing, never stores plaintext
//! - **Notification**: best-effort WhatsApp welcome message via Twilio
//! - **Observability**: structured JSON logging and Prometheus counters
//!
//! # Startup Sequence
//!
//! 1. Initialize metrics and structured logging
//! 2. Load environment configuration and validate it
//! 3. Establish the database pool and bootstrap the schema
//! 4. Build the WhatsApp notifier (optional, degrades gracefully)
//! 5. Build the HTTP application with routes and middleware
//! 6. Start the HTTP server with graceful shutdown handling

use axum::Server;
use dotenvy::dotenv;
use std::{env, net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::app::{build_app, AppState};
use crate::config::database::{ensure_schema, init_pool};
use crate::db::store::DieselStore;
use crate::utils::hashing::Argon2Hasher;
use crate::utils::metrics;
use crate::utils::whatsapp::{Notifier, WhatsAppConfig};

mod app;
mod config;
mod db;
mod handlers;
mod utils;

/// Default port if not specified in environment
const DEFAULT_PORT: u16 = 3000;

/// Default host address if not specified in environment
const DEFAULT_HOST: &str = "127.0.0.1";

/// Required environment variables that must be present for the service to start
const REQUIRED_ENV_VARS: &[&str] = &["DATABASE_URL"];

/// Optional environment variables that enhance service functionality if present
const OPTIONAL_ENV_VARS: &[&str] = &[
    "TWILIO_ACCOUNT_SID",
    "TWILIO_AUTH_TOKEN",
    "TWILIO_WHATSAPP_NUMBER",
    "HOST",
    "PORT",
    "ENABLE_DEBUG_ROUTES",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize Prometheus metrics
    metrics::init();

    // Configure structured JSON logging with async writer; the guard must
    // stay alive for the lifetime of the process
    let _log_guard = setup_logging();
    info!(
        service = "registration-service",
        version = env!("CARGO_PKG_VERSION"),
        "Server initialization: logging & metrics configured"
    );

    // Load environment variables from .env file if present
    dotenv().ok();
    info!("Server initialization: environment loaded");

    check_required_env_vars();

    let state = initialize_services().await?;
    info!("Server initialization: services initialized");

    let app = build_app(state).await;
    info!("Server initialization: application built");

    let addr = get_server_address()?;
    info!(address = %addr, "Server startup: listening");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown: complete");
    Ok(())
}

/// Sets up structured JSON logging with a non-blocking stdout writer.
///
/// Returns the writer guard, which must be held until process exit so
/// buffered log lines are flushed.
fn setup_logging() -> WorkerGuard {
    let (non_blocking, guard) = non_blocking(std::io::stdout());

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default().with(filter).with(fmt_layer).init();

    guard
}

/// Initialize all service dependencies.
///
/// Sets up and verifies:
/// - Database pool and schema (required)
/// - WhatsApp notifier (optional; registrations still succeed without it)
async fn initialize_services() -> Result<AppState, Box<dyn std::error::Error>> {
    let pool = init_pool();

    // Verify database connectivity before accepting traffic
    pool.get().map_err(|e| {
        error!(error = %e, "Database connection failed");
        e
    })?;
    info!("Server initialization: database pool ready");

    ensure_schema(&pool)?;
    info!("Server initialization: database schema ready");

    let notifier: Option<Arc<dyn Notifier>> = match WhatsAppConfig::from_env() {
        Ok(cfg) => {
            info!("Server initialization: WhatsApp notifier configured");
            Some(Arc::new(cfg))
        }
        Err(e) => {
            warn!(
                error = %e,
                "Server initialization: WhatsApp config error, disabling notifications"
            );
            None
        }
    };

    Ok(AppState {
        store: Arc::new(DieselStore::new(pool)),
        notifier,
        hasher: Arc::new(Argon2Hasher),
    })
}

/// Validate required and optional environment variables.
///
/// Required variables fail loudly in the log; optional ones only warn.
/// Actual startup failure happens when the dependent service initializes.
fn check_required_env_vars() {
    let mut missing_required = false;

    for &var in REQUIRED_ENV_VARS {
        if env::var(var).is_err() {
            error!(variable = var, "Missing required environment variable");
            missing_required = true;
        }
    }

    if !missing_required {
        info!("Server initialization: required environment variables present");
    }

    let missing: Vec<_> = OPTIONAL_ENV_VARS
        .iter()
        .filter(|&&var| env::var(var).is_err())
        .collect();

    if missing.is_empty() {
        info!("Server initialization: all optional environment variables present");
    } else {
        warn!(
            missing = ?missing,
            "Server initialization: some optional environment variables missing"
        );
    }
}

/// Determine server binding address from HOST/PORT environment variables,
/// falling back to 127.0.0.1:3000.
fn get_server_address() -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

    let addr = format!("{}:{}", host, port).parse()?;

    Ok(addr)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// Handles both Ctrl+C for interactive use and SIGTERM for container
/// environments.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received: Ctrl+C");
    };

    #[cfg(unix)]
    let sigterm = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Shutdown signal received: SIGTERM");
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = sigterm => {},
    }

    info!("Starting graceful shutdown, waiting for connections to close");
}
