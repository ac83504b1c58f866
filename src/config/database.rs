//! Database configuration and connection pool management.
//!
//! Provides SQLite connectivity with r2d2 connection pooling and a
//! startup schema bootstrap (no migration framework is used; the single
//! table is created idempotently, matching the deployment model of a
//! file-based store).

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::SqliteConnection;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use crate::db::store::StoreError;
use crate::utils::metrics::DB_OPERATIONS;

/// Database connection pool type.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Pooled database connection type.
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Idempotent schema bootstrap, mirroring the store's authoritative
/// constraints: serial primary key, NOT NULL business fields, and the
/// unique email index that backs duplicate detection.
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL,
    password_hash TEXT NOT NULL
)";

/// Helper to parse an environment variable with a default value.
fn get_env_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Initializes the database connection pool.
///
/// # Configuration (from environment variables with defaults)
/// - `DATABASE_URL`: path to the SQLite database file (required).
/// - `DB_MAX_POOL_SIZE`: max connections (default: 10).
/// - `DB_CONNECTION_TIMEOUT_SECS`: connection timeout (default: 10).
///
/// # Panics
/// Panics if `DATABASE_URL` is not set or pool creation fails (fail-fast
/// at startup).
pub fn init_pool() -> DbPool {
    let database_url = env::var(DATABASE_URL_ENV).unwrap_or_else(|_| {
        error!("Missing {} environment variable", DATABASE_URL_ENV);
        panic!("DATABASE_URL must be set in .env or environment variables");
    });

    let max_size = get_env_var("DB_MAX_POOL_SIZE", 10u32);
    let connection_timeout = get_env_var("DB_CONNECTION_TIMEOUT_SECS", 10u64);

    info!("Initializing SQLite connection pool");

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(connection_timeout))
        .test_on_check_out(true)
        .build(manager)
        .unwrap_or_else(|e| {
            error!("Failed to create SQLite connection pool: {}", e);
            panic!("Failed to create database connection pool: {}", e);
        });

    info!(
        "SQLite pool initialized (max={}, timeout={}s)",
        max_size, connection_timeout
    );

    pool
}

/// Acquires a database connection from the pool.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, StoreError> {
    match pool.get() {
        Ok(conn) => {
            DB_OPERATIONS.with_label_values(&["connection", "success"]).inc();
            Ok(conn)
        }
        Err(e) => {
            error!("Failed to acquire database connection: {}", e);
            DB_OPERATIONS.with_label_values(&["connection", "failure"]).inc();
            Err(StoreError::Pool(e.to_string()))
        }
    }
}

/// Creates the accounts table if it does not exist yet.
pub fn ensure_schema(pool: &DbPool) -> Result<(), StoreError> {
    let mut conn = get_connection(pool)?;

    diesel::sql_query(SCHEMA_SQL)
        .execute(&mut conn)
        .map_err(|e| {
            error!("Schema bootstrap failed: {}", e);
            DB_OPERATIONS.with_label_values(&["schema", "failure"]).inc();
            StoreError::Query(e.to_string())
        })?;

    DB_OPERATIONS.with_label_values(&["schema", "success"]).inc();
    Ok(())
}
