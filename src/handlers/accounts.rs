//! Development-only account listing.
//!
//! Mounted behind `ENABLE_DEBUG_ROUTES` (see `app.rs`); only non-secret
//! fields leave the process.

use axum::{Extension, Json};
use serde_json::Value;

use crate::app::AppState;
use crate::db::accounts::Account;
use crate::utils::errors::ApiError;

/// `GET /api/users`
pub async fn list_accounts_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Value>, ApiError> {
    let accounts = state.store.list().map_err(ApiError::from)?;

    let safe: Vec<Value> = accounts.iter().map(Account::to_safe_info).collect();
    Ok(Json(Value::Array(safe)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::{NewAccount, RegisterData};
    use crate::db::store::AccountStore;
    use crate::handlers::register_logic::process_registration;
    use crate::utils::test_utils::memory_state;

    #[tokio::test]
    async fn listing_exposes_only_safe_fields() {
        let (_, state) = memory_state();
        let data = RegisterData {
            full_name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            phone: "(11) 91234-5678".to_string(),
            password: "secret1".to_string(),
        };
        process_registration(&state, data).await;

        let Json(body) = list_accounts_handler(Extension(state)).await.unwrap();
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["email"], "maria@example.com");
        assert!(listed[0].get("passwordHash").is_none());
        assert!(listed[0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn listing_preserves_insertion_order() {
        let (store, state) = memory_state();
        for email in ["first@example.com", "second@example.com"] {
            store
                .insert(NewAccount {
                    full_name: "Maria Silva".to_string(),
                    email: email.to_string(),
                    phone: "(11) 91234-5678".to_string(),
                    password_hash: "$argon2id$fake".to_string(),
                })
                .unwrap();
        }

        let Json(body) = list_accounts_handler(Extension(state)).await.unwrap();
        let listed = body.as_array().unwrap();
        assert_eq!(listed[0]["email"], "first@example.com");
        assert_eq!(listed[1]["email"], "second@example.com");
    }
}
