//! Password hashing.
//!
//! Salted Argon2id with a fixed configured cost. Hashing is CPU-intensive
//! by design; a failure here is fatal to the request so a plaintext
//! password can never reach the store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use once_cell::sync::Lazy;
use tracing::info;

use crate::utils::errors::HashingError;

// Argon2id parameters, balanced for security and throughput on a small
// service. Overridable via environment variables for constrained hosts.
const ARGON2_MEMORY_COST: u32 = 32768; // 32 MB
const ARGON2_TIME_COST: u32 = 2;
const ARGON2_PARALLELISM: u32 = 2;
const ARGON2_VERSION: Version = Version::V0x13;

/// A global, thread-safe, lazily-initialized instance of the Argon2 hasher.
static ARGON2_HASHER: Lazy<Argon2<'static>> = Lazy::new(|| {
    let memory = std::env::var("ARGON2_MEMORY_COST")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ARGON2_MEMORY_COST);

    let time = std::env::var("ARGON2_TIME_COST")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ARGON2_TIME_COST);

    let parallelism = std::env::var("ARGON2_PARALLELISM")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ARGON2_PARALLELISM);

    info!(
        "Initializing Argon2 hasher with memory={}, time={}, parallelism={}",
        memory, time, parallelism
    );

    Argon2::new(
        argon2::Algorithm::Argon2id,
        ARGON2_VERSION,
        Params::new(memory, time, parallelism, None).expect("Invalid Argon2 params"),
    )
});

/// Credential hashing contract consumed by the registration pipeline.
///
/// A seam rather than a free function so tests can observe the pipeline's
/// behavior when hashing fails.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashingError>;
}

/// Production hasher backed by the global Argon2id instance.
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashingError> {
        hash_password(password)
    }
}

/// Hashes a password using the configured Argon2id parameters.
pub fn hash_password(password: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);

    ARGON2_HASHER
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashingError(e.to_string()))
}

/// Verifies a password against a stored hash.
///
/// Registration itself never verifies; this exists for future login flows
/// and for tests asserting that stored hashes are real.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, HashingError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| HashingError(format!("invalid stored hash: {}", e)))?;

    Ok(ARGON2_HASHER
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
