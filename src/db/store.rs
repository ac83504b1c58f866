//! Account store abstraction.
//!
//! The registration pipeline is written against the `AccountStore` trait
//! only, so the Diesel/SQLite implementation can be replaced by another
//! backend (or a test fake) without touching orchestration logic.

use thiserror::Error;

use crate::config::database::{get_connection, DbPool};
use crate::db::accounts::{Account, NewAccount};

/// Storage faults, separated so the pipeline can map a lost duplicate race
/// to a client error and everything else to a server error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database connection unavailable: {0}")]
    Pool(String),
    #[error("database query failed: {0}")]
    Query(String),
}

/// Persistence contract for registrant accounts.
pub trait AccountStore: Send + Sync {
    /// Looks up an account by email. `Ok(None)` means "not registered".
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Inserts a new account. Returns `StoreError::DuplicateEmail` when the
    /// unique-email constraint rejects the write.
    fn insert(&self, new_account: NewAccount) -> Result<Account, StoreError>;

    /// Lists all accounts (development listing only).
    fn list(&self) -> Result<Vec<Account>, StoreError>;
}

/// Diesel-backed store over a pooled SQLite connection.
pub struct DieselStore {
    pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AccountStore for DieselStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let mut conn = get_connection(&self.pool)?;
        Account::find_by_email(&mut conn, email)
    }

    fn insert(&self, new_account: NewAccount) -> Result<Account, StoreError> {
        let mut conn = get_connection(&self.pool)?;
        Account::insert(&mut conn, &new_account)
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        let mut conn = get_connection(&self.pool)?;
        Account::list_all(&mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::database::ensure_schema;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::SqliteConnection;

    /// Single-connection in-memory pool so all queries hit the same SQLite
    /// database.
    fn memory_store() -> DieselStore {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("in-memory pool");
        ensure_schema(&pool).expect("schema bootstrap");
        DieselStore::new(pool)
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            full_name: "Maria Silva".to_string(),
            email: email.to_string(),
            phone: "(11) 91234-5678".to_string(),
            password_hash: "$argon2id$fake".to_string(),
        }
    }

    #[test]
    fn test_find_by_email_returns_none_for_unknown() {
        let store = memory_store();
        let found = store.find_by_email("nobody@example.com").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_insert_and_find_round_trip() {
        let store = memory_store();

        let created = store.insert(new_account("maria@example.com")).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.full_name, "Maria Silva");

        let found = store
            .find_by_email("maria@example.com")
            .unwrap()
            .expect("account should exist");
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "$argon2id$fake");
    }

    #[test]
    fn test_duplicate_email_maps_to_distinct_error() {
        let store = memory_store();

        store.insert(new_account("dup@example.com")).unwrap();
        let err = store.insert(new_account("dup@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        // Exactly one row survives the rejected write
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_returns_accounts_in_insertion_order() {
        let store = memory_store();

        store.insert(new_account("first@example.com")).unwrap();
        store.insert(new_account("second@example.com")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email, "first@example.com");
        assert_eq!(all[1].email, "second@example.com");
    }
}
