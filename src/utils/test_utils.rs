//! Test utilities for the registration service.
//!
//! Provides in-memory fakes for the `AccountStore` and `Notifier` seams so
//! pipeline tests run without a database or network.

#![cfg(test)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use crate::app::AppState;
use crate::db::accounts::{Account, NewAccount};
use crate::db::store::{AccountStore, StoreError};
use crate::utils::errors::HashingError;
use crate::utils::hashing::{Argon2Hasher, CredentialHasher};
use crate::utils::whatsapp::{
    welcome_message, whatsapp_destination, Notifier, NotifyError,
};

// =============================================================================
// STORE FAKES
// =============================================================================

/// In-memory account store enforcing the unique-email constraint.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<Vec<Account>>,
    next_id: AtomicI32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

impl AccountStore for MemoryStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.iter().find(|a| a.email == email).cloned())
    }

    fn insert(&self, new_account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.email == new_account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let account = Account {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            full_name: new_account.full_name,
            email: new_account.email,
            phone: new_account.phone,
            password_hash: new_account.password_hash,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.lock().unwrap().clone())
    }
}

/// Store that simulates losing the duplicate race: the pre-check sees no
/// account, but the constraint rejects the insert.
pub struct RaceLosingStore;

impl AccountStore for RaceLosingStore {
    fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
        Ok(None)
    }

    fn insert(&self, _new_account: NewAccount) -> Result<Account, StoreError> {
        Err(StoreError::DuplicateEmail)
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        Ok(Vec::new())
    }
}

/// Store whose reads fail, for exercising the pre-check transport-error path.
pub struct BrokenStore;

impl AccountStore for BrokenStore {
    fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
        Err(StoreError::Pool("connection refused".to_string()))
    }

    fn insert(&self, _new_account: NewAccount) -> Result<Account, StoreError> {
        Err(StoreError::Pool("connection refused".to_string()))
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        Err(StoreError::Pool("connection refused".to_string()))
    }
}

// =============================================================================
// HASHER FAKES
// =============================================================================

/// Always fails, for exercising the hashing-failure exit of the pipeline.
pub struct FailingHasher;

impl CredentialHasher for FailingHasher {
    fn hash(&self, _password: &str) -> Result<String, HashingError> {
        Err(HashingError("salt generation failed".to_string()))
    }
}

// =============================================================================
// NOTIFIER FAKES
// =============================================================================

/// Records the derived destination and rendered body of each send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_welcome(&self, phone: &str, first_name: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((whatsapp_destination(phone), welcome_message(first_name)));
        Ok(())
    }
}

/// Always fails, for exercising the degraded-success path.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_welcome(&self, _phone: &str, _first_name: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection timed out".to_string()))
    }
}

// =============================================================================
// STATE BUILDERS
// =============================================================================

/// State with an in-memory store, the real hasher, and no notifier.
pub fn memory_state() -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        notifier: None,
        hasher: Arc::new(Argon2Hasher),
    };
    (store, state)
}

/// State with an in-memory store, the real hasher, and the given notifier.
pub fn state_with_notifier(notifier: Arc<dyn Notifier>) -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        notifier: Some(notifier),
        hasher: Arc::new(Argon2Hasher),
    };
    (store, state)
}
