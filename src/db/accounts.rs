//! Account model and Diesel-backed queries.
//!
//! The stored record never contains the submitted plaintext password; the
//! pipeline hands this module an already-hashed credential.

use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::{Insertable, Queryable, Selectable, SqliteConnection};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db::schema::accounts;
use crate::db::store::StoreError;
use crate::utils::metrics::DB_OPERATIONS;

// =============================================================================
// DATA MODELS
// =============================================================================

/// Account model mapping to the database schema.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Account {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// New account for database insertion.
#[derive(Debug, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Registration request data as submitted by the form.
///
/// Fields default to empty strings so that an absent JSON key reaches the
/// validator (which reports "all fields required") instead of failing
/// deserialization.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterData {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

// =============================================================================
// IMPLEMENTATION
// =============================================================================

impl Account {
    /// Finds an account by email.
    ///
    /// "Not found" is a normal outcome for the duplicate pre-check and is
    /// reported as `Ok(None)`; only transport or query faults are errors.
    pub fn find_by_email(
        conn: &mut SqliteConnection,
        email_str: &str,
    ) -> Result<Option<Self>, StoreError> {
        use crate::db::schema::accounts::dsl::*;

        accounts
            .filter(email.eq(email_str))
            .first::<Account>(conn)
            .optional()
            .map_err(|e| {
                error!("Database error finding account by email: {}", e);
                DB_OPERATIONS
                    .with_label_values(&["account_lookup", "failure"])
                    .inc();
                StoreError::Query(e.to_string())
            })
            .map(|account| {
                DB_OPERATIONS
                    .with_label_values(&["account_lookup", "success"])
                    .inc();
                account
            })
    }

    /// Inserts a new account, mapping the unique-email constraint violation
    /// to its own error variant. The constraint is the authoritative
    /// duplicate signal; the pipeline's pre-check is only a fast path.
    pub fn insert(
        conn: &mut SqliteConnection,
        new_account: &NewAccount,
    ) -> Result<Self, StoreError> {
        use crate::db::schema::accounts::dsl::*;

        diesel::insert_into(accounts)
            .values(new_account)
            .execute(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::UniqueViolation,
                    _,
                ) => {
                    DB_OPERATIONS
                        .with_label_values(&["account_create", "duplicate"])
                        .inc();
                    StoreError::DuplicateEmail
                }
                other => {
                    error!("Failed to save account {}: {}", new_account.email, other);
                    DB_OPERATIONS
                        .with_label_values(&["account_create", "failure"])
                        .inc();
                    StoreError::Query(other.to_string())
                }
            })?;

        let created = accounts
            .filter(email.eq(new_account.email.as_str()))
            .first::<Account>(conn)
            .map_err(|e| {
                error!("Failed to read back created account: {}", e);
                DB_OPERATIONS
                    .with_label_values(&["account_create", "failure"])
                    .inc();
                StoreError::Query(e.to_string())
            })?;

        DB_OPERATIONS
            .with_label_values(&["account_create", "success"])
            .inc();
        Ok(created)
    }

    /// Loads all accounts, oldest first.
    pub fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Self>, StoreError> {
        use crate::db::schema::accounts::dsl::*;

        accounts
            .order(id.asc())
            .load::<Account>(conn)
            .map_err(|e| {
                error!("Database error listing accounts: {}", e);
                DB_OPERATIONS
                    .with_label_values(&["account_list", "failure"])
                    .inc();
                StoreError::Query(e.to_string())
            })
    }

    /// Returns non-secret account fields for the development listing.
    pub fn to_safe_info(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "fullName": self.full_name,
            "email": self.email,
            "phone": self.phone
        })
    }
}
