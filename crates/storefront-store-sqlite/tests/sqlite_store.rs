// crates/storefront-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Key/Value Store Tests
// Description: Validate SQLite KeyValueStore behavior.
// Purpose: Ensure durable persistence, limits, and schema checks.
// Dependencies: storefront-store-sqlite, storefront-store, storefront-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed key/value store, including its use
//! as the persistent backend of the redundant order store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use proptest::prelude::*;
use rusqlite::Connection;
use storefront_core::InMemoryKeyValueStore;
use storefront_core::KeyValueStore;
use storefront_core::ManualClock;
use storefront_core::OrderId;
use storefront_core::StorageError;
use storefront_core::StoredOrderRecord;
use storefront_core::Timestamp;
use storefront_store::RedundantOrderStore;
use storefront_store_sqlite::MAX_VALUE_BYTES;
use storefront_store_sqlite::SqliteKeyValueStore;
use storefront_store_sqlite::SqliteStoreConfig;
use storefront_store_sqlite::SqliteStoreError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens a store in a fresh temp directory.
fn open_store() -> (TempDir, SqliteStoreConfig, SqliteKeyValueStore) {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(dir.path().join("orders").join("store.db"));
    let store = SqliteKeyValueStore::new(&config).unwrap();
    (dir, config, store)
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

#[test]
fn values_survive_reopen() {
    let (_dir, config, store) = open_store();
    store.set("order_id", "ORD-1").unwrap();
    store.set("order_id", "ORD-2").unwrap();
    drop(store);

    let reopened = SqliteKeyValueStore::new(&config).unwrap();

    assert_eq!(reopened.get("order_id").unwrap().as_deref(), Some("ORD-2"));
    assert_eq!(reopened.get("missing").unwrap(), None);
}

#[test]
fn remove_is_idempotent() {
    let (_dir, _config, store) = open_store();
    store.set("pending_order", "{}").unwrap();

    store.remove("pending_order").unwrap();
    store.remove("pending_order").unwrap();

    assert_eq!(store.get("pending_order").unwrap(), None);
}

#[test]
fn entries_report_keys_and_update_times() {
    let (_dir, _config, store) = open_store();
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(5_000)));
    let store = store.with_clock(clock.clone());
    store.set("b", "2").unwrap();
    clock.set(Timestamp::from_unix_millis(9_000));
    store.set("a", "1").unwrap();

    let entries = store.entries().unwrap();

    assert_eq!(entries, vec![("a".to_string(), 9_000), ("b".to_string(), 5_000)]);
}

// ============================================================================
// SECTION: Limits and Schema
// ============================================================================

#[test]
fn oversized_values_map_to_quota_exceeded() {
    let (_dir, _config, store) = open_store();
    let value = "x".repeat(MAX_VALUE_BYTES + 1);

    let err = store.set("current_order", &value).unwrap_err();

    assert!(matches!(err, StorageError::QuotaExceeded(_)));
}

#[test]
fn empty_keys_are_rejected() {
    let (_dir, _config, store) = open_store();
    assert!(matches!(store.get(""), Err(StorageError::Backend(_))));
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = SqliteKeyValueStore::new(&SqliteStoreConfig::new(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn unknown_schema_version_fails_closed() {
    let (_dir, config, store) = open_store();
    drop(store);
    let connection = Connection::open(&config.path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);

    let result = SqliteKeyValueStore::new(&config);

    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

// ============================================================================
// SECTION: Redundant Order Store Backend
// ============================================================================

#[test]
fn redundant_store_recovers_from_sqlite_after_session_loss() {
    let (_dir, config, store) = open_store();
    let session = InMemoryKeyValueStore::new();
    let orders = RedundantOrderStore::new(Arc::new(store), Arc::new(session.clone()));
    let record = StoredOrderRecord::new(OrderId::new("ORD-9"), Timestamp::from_unix_millis(1));
    assert!(orders.store(&record));

    session.remove("cashfree_order").unwrap();
    let reopened = SqliteKeyValueStore::new(&config).unwrap();
    let orders = RedundantOrderStore::new(Arc::new(reopened), Arc::new(session));

    assert_eq!(orders.retrieve(), Some(record));
}

proptest! {
    #[test]
    fn stored_values_read_back_unchanged(key in "[a-zA-Z_]{1,32}", value in ".{0,256}") {
        let (_dir, _config, store) = open_store();
        store.set(&key, &value).unwrap();
        prop_assert_eq!(store.get(&key).unwrap(), Some(value));
    }
}
