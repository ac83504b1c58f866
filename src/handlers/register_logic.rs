//! Business logic for user registration.
//!
//! The pipeline runs in a fixed sequence with early exits:
//! validate → duplicate pre-check → hash → insert → notify.
//! Each failure is terminal for the request; nothing retries. The
//! notification stage is best-effort: once the insert has committed, a
//! notification failure only downgrades the response to a success with a
//! warning, never an error.
//!
//! Store queries and password hashing are CPU/IO-bound and synchronous, so
//! they run on the blocking thread pool to keep the async workers free.

use axum::http::StatusCode;
use serde_json::json;
use tokio::task::spawn_blocking;
use tracing::{error, info, warn};

use crate::{
    app::AppState,
    db::accounts::{NewAccount, RegisterData},
    db::store::StoreError,
    utils::errors::HashingError,
    utils::metrics::REGISTRATIONS,
    utils::validators::validate_registration,
    utils::whatsapp::first_name,
};

const MSG_DUPLICATE: &str = "Email already registered.";
const MSG_SERVER_ERROR: &str = "Server error.";
const MSG_SAVE_FAILED: &str = "Failed to save user.";
const MSG_SUCCESS: &str = "Registration successful!";
const MSG_NOTIFY_FAILED: &str = "Registered, but the WhatsApp notification could not be sent.";
const MSG_NOTIFY_UNCONFIGURED: &str = "Registered, but WhatsApp notifications are not configured.";

/// Processes a registration request end to end.
///
/// Returns (StatusCode, JSON body) for the handler to respond with.
/// Exactly one `REGISTRATIONS` outcome label is incremented per request.
pub async fn process_registration(
    state: &AppState,
    data: RegisterData,
) -> (StatusCode, serde_json::Value) {
    // Validate input, first failure wins
    if let Err(e) = validate_registration(&data) {
        warn!(reason = %e, "Registration rejected by validation");
        REGISTRATIONS.with_label_values(&["validation_failed"]).inc();
        return (
            StatusCode::BAD_REQUEST,
            json!({
                "status": "error",
                "message": e.to_string()
            }),
        );
    }

    // Duplicate pre-check. This is a UX fast path only; the store's unique
    // constraint below remains the authoritative duplicate signal.
    let store = state.store.clone();
    let email = data.email.clone();
    let pre_check = spawn_blocking(move || store.find_by_email(&email))
        .await
        .map_err(|e| StoreError::Pool(format!("blocking task failed: {}", e)))
        .and_then(|result| result);
    match pre_check {
        Ok(Some(_)) => {
            info!(email = %data.email, "Registration rejected: email already registered");
            REGISTRATIONS.with_label_values(&["already_exists"]).inc();
            return (
                StatusCode::BAD_REQUEST,
                json!({
                    "status": "error",
                    "message": MSG_DUPLICATE
                }),
            );
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Duplicate pre-check failed");
            REGISTRATIONS.with_label_values(&["store_error"]).inc();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "status": "error",
                    "message": MSG_SERVER_ERROR
                }),
            );
        }
    }

    // Hash the password; the plaintext must never reach the store
    let hasher = state.hasher.clone();
    let password = data.password.clone();
    let hashed = spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| HashingError(format!("blocking task failed: {}", e)))
        .and_then(|result| result);
    let password_hash = match hashed {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Password hashing failed");
            REGISTRATIONS.with_label_values(&["hash_error"]).inc();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "status": "error",
                    "message": MSG_SERVER_ERROR
                }),
            );
        }
    };

    // Authoritative write
    let new_account = NewAccount {
        full_name: data.full_name.clone(),
        email: data.email.clone(),
        phone: data.phone.clone(),
        password_hash,
    };
    let store = state.store.clone();
    let inserted = spawn_blocking(move || store.insert(new_account))
        .await
        .map_err(|e| StoreError::Pool(format!("blocking task failed: {}", e)))
        .and_then(|result| result);
    let account = match inserted {
        Ok(account) => account,
        Err(StoreError::DuplicateEmail) => {
            // Race lost against a concurrent insert after the pre-check
            info!(email = %data.email, "Registration rejected by unique constraint");
            REGISTRATIONS.with_label_values(&["already_exists"]).inc();
            return (
                StatusCode::BAD_REQUEST,
                json!({
                    "status": "error",
                    "message": MSG_DUPLICATE
                }),
            );
        }
        Err(e) => {
            error!(error = %e, "Saving account failed");
            REGISTRATIONS.with_label_values(&["store_error"]).inc();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "status": "error",
                    "message": MSG_SAVE_FAILED
                }),
            );
        }
    };

    info!(id = account.id, email = %account.email, "Account created");

    // Best-effort notification; the account above is already durable
    let (outcome, warning) = match &state.notifier {
        Some(notifier) => {
            match notifier
                .send_welcome(&account.phone, first_name(&account.full_name))
                .await
            {
                Ok(()) => ("success", None),
                Err(e) => {
                    warn!(error = %e, email = %account.email, "Welcome notification failed");
                    ("notify_failed", Some(MSG_NOTIFY_FAILED))
                }
            }
        }
        None => {
            warn!("Notifier not configured, skipping welcome message");
            ("notify_skipped", Some(MSG_NOTIFY_UNCONFIGURED))
        }
    };

    REGISTRATIONS.with_label_values(&[outcome]).inc();
    match warning {
        None => (
            StatusCode::OK,
            json!({
                "status": "success",
                "message": MSG_SUCCESS
            }),
        ),
        Some(warning) => (
            StatusCode::OK,
            json!({
                "status": "success",
                "message": MSG_SUCCESS,
                "warning": warning
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::AccountStore;
    use crate::utils::hashing::{verify_password, Argon2Hasher};
    use crate::utils::test_utils::{
        memory_state, state_with_notifier, BrokenStore, FailingHasher, FailingNotifier,
        RaceLosingStore, RecordingNotifier,
    };
    use std::sync::Arc;

    fn maria() -> RegisterData {
        RegisterData {
            full_name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            phone: "(11) 91234-5678".to_string(),
            password: "secret1".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_field_returns_bad_request_and_persists_nothing() {
        let (store, state) = memory_state();
        let data = RegisterData {
            full_name: String::new(),
            ..maria()
        };

        let (status, body) = process_registration(&state, data).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("All fields are required."));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn invalid_email_returns_bad_request() {
        let (store, state) = memory_state();
        let data = RegisterData {
            email: "a@b".to_string(),
            ..maria()
        };

        let (status, body) = process_registration(&state, data).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Invalid email address."));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn invalid_phone_returns_bad_request() {
        let (store, state) = memory_state();
        let data = RegisterData {
            phone: "11912345678".to_string(),
            ..maria()
        };

        let (status, body) = process_registration(&state, data).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Invalid phone number."));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn short_password_returns_bad_request() {
        let (store, state) = memory_state();
        let data = RegisterData {
            password: "12345".to_string(),
            ..maria()
        };

        let (status, body) = process_registration(&state, data).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            json!("Password must be at least 6 characters long.")
        );
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn six_character_password_is_accepted() {
        let (store, state) = memory_state();
        let data = RegisterData {
            password: "123456".to_string(),
            ..maria()
        };

        let (status, _) = process_registration(&state, data).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn successful_registration_end_to_end() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (store, state) = state_with_notifier(notifier.clone());

        let (status, body) = process_registration(&state, maria()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("successful"));
        assert!(body.get("warning").is_none());

        // Exactly one account, with a real hash instead of the plaintext
        let accounts = store.list().unwrap();
        assert_eq!(accounts.len(), 1);
        let account = &accounts[0];
        assert_eq!(account.email, "maria@example.com");
        assert_ne!(account.password_hash, "secret1");
        assert!(verify_password("secret1", &account.password_hash).unwrap());

        // One notification attempt with the derived destination and the
        // first name in the body
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "whatsapp:+5511912345678");
        assert!(sent[0].1.contains("Maria"));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_on_second_submission() {
        let (store, state) = memory_state();

        let (first, _) = process_registration(&state, maria()).await;
        assert_eq!(first, StatusCode::OK);

        let (second, body) = process_registration(&state, maria()).await;
        assert_eq!(second, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Email already registered."));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn lost_duplicate_race_maps_to_bad_request() {
        // Pre-check passes but the unique constraint rejects the insert
        let state = crate::app::AppState {
            store: Arc::new(RaceLosingStore),
            notifier: None,
            hasher: Arc::new(Argon2Hasher),
        };

        let (status, body) = process_registration(&state, maria()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Email already registered."));
    }

    #[tokio::test]
    async fn store_failure_returns_generic_server_error() {
        let state = crate::app::AppState {
            store: Arc::new(BrokenStore),
            notifier: None,
            hasher: Arc::new(Argon2Hasher),
        };

        let (status, body) = process_registration(&state, maria()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // No internal detail leaks to the client
        assert_eq!(body["message"], json!("Server error."));
    }

    #[tokio::test]
    async fn hashing_failure_returns_generic_server_error() {
        let store = Arc::new(crate::utils::test_utils::MemoryStore::new());
        let state = crate::app::AppState {
            store: store.clone(),
            notifier: None,
            hasher: Arc::new(FailingHasher),
        };

        let before = REGISTRATIONS.with_label_values(&["hash_error"]).get();
        let (status, body) = process_registration(&state, maria()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // Generic body, no hashing detail leaks to the client
        assert_eq!(body["message"], json!("Server error."));
        assert_eq!(
            REGISTRATIONS.with_label_values(&["hash_error"]).get() - before,
            1.0
        );
        // Nothing was persisted
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn notification_failure_is_degraded_success() {
        let (store, state) = state_with_notifier(Arc::new(FailingNotifier));

        let failed_before = REGISTRATIONS.with_label_values(&["notify_failed"]).get();
        let (status, body) = process_registration(&state, maria()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("success"));
        assert!(body["warning"]
            .as_str()
            .unwrap()
            .contains("notification could not be sent"));

        // The account is durable despite the failed notification
        assert_eq!(store.len(), 1);

        // The request terminates under exactly one outcome label
        assert_eq!(
            REGISTRATIONS.with_label_values(&["notify_failed"]).get() - failed_before,
            1.0
        );
    }

    #[tokio::test]
    async fn missing_notifier_is_degraded_success() {
        let (store, state) = memory_state();

        let (status, body) = process_registration(&state, maria()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("success"));
        assert!(body["warning"]
            .as_str()
            .unwrap()
            .contains("not configured"));
        assert_eq!(store.len(), 1);
    }
}
