// crates/storefront-core/src/runtime/store.rs
// ============================================================================
// Module: Storefront In-Memory Store
// Description: In-memory key/value store with failure injection.
// Purpose: Back session-scoped storage and exercise storage failure paths.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryKeyValueStore`] serves as the session-scoped backend in tools and as
//! a test double. It can be switched into an unavailable mode to mimic storage
//! disabled by privacy settings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::interfaces::KeyValueStore;
use crate::interfaces::StorageError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory key/value store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyValueStore {
    /// Entries protected by a mutex.
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    /// When set, every operation fails with [`StorageError::Unavailable`].
    unavailable: Arc<AtomicBool>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles simulated unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the stored keys in lexical order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the store is unavailable.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_available()?;
        let guard = self.lock()?;
        Ok(guard.keys().cloned().collect())
    }

    /// Fails when simulated unavailability is active.
    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory store disabled".to_string()));
        }
        Ok(())
    }

    /// Locks the entry map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Backend("store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.lock()?.remove(key);
        Ok(())
    }
}
