// crates/storefront-store/tests/redundancy.rs
// ============================================================================
// Module: Redundant Order Store Tests
// Description: Write fan-out, read priority, degradation, and cleanup.
// Purpose: Ensure any surviving copy recovers the order and failures never escape.
// Dependencies: storefront-store, storefront-core
// ============================================================================

//! ## Overview
//! Uses in-memory backends with failure injection.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;

use storefront_core::InMemoryAuditSink;
use storefront_core::InMemoryKeyValueStore;
use storefront_core::KeyValueStore;
use storefront_core::OrderId;
use storefront_core::StoredOrderRecord;
use storefront_core::Timestamp;
use storefront_store::PERSISTENT_RECORD_KEYS;
use storefront_store::RedundantOrderStore;
use storefront_store::SESSION_RECORD_KEY;
use storefront_store::SIMPLE_ID_KEYS;
use storefront_store::SIMPLE_STORAGE_SOURCE;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Backends plus the store built over them.
struct Fixture {
    /// Persistent backend.
    persistent: InMemoryKeyValueStore,
    /// Session backend.
    session: InMemoryKeyValueStore,
    /// Audit capture.
    audit: Arc<InMemoryAuditSink>,
    /// Store under test.
    store: RedundantOrderStore,
}

/// Builds a store over fresh in-memory backends.
fn fixture() -> Fixture {
    let persistent = InMemoryKeyValueStore::new();
    let session = InMemoryKeyValueStore::new();
    let audit = Arc::new(InMemoryAuditSink::new());
    let store = RedundantOrderStore::new(Arc::new(persistent.clone()), Arc::new(session.clone()))
        .with_audit(audit.clone());
    Fixture {
        persistent,
        session,
        audit,
        store,
    }
}

/// Builds a populated record.
fn record(order_id: &str) -> StoredOrderRecord {
    let mut record =
        StoredOrderRecord::new(OrderId::new(order_id), Timestamp::from_unix_millis(1_700));
    record.cf_order_id = Some("cf_77".to_string());
    record.order_amount = Some(1_299.0);
    record
}

// ============================================================================
// SECTION: Store and Retrieve
// ============================================================================

#[test]
fn store_writes_every_structured_and_simple_key() {
    let fx = fixture();
    assert!(fx.store.store(&record("ORD-1")));

    for key in PERSISTENT_RECORD_KEYS {
        assert!(fx.persistent.get(key).unwrap().is_some(), "missing {key}");
    }
    assert!(fx.session.get(SESSION_RECORD_KEY).unwrap().is_some());
    for key in SIMPLE_ID_KEYS {
        assert_eq!(fx.persistent.get(key).unwrap().as_deref(), Some("ORD-1"));
    }
    assert_eq!(fx.store.retrieve(), Some(record("ORD-1")));
}

#[test]
fn any_single_deleted_key_still_recovers_the_order() {
    let all_keys: Vec<(&str, bool)> = PERSISTENT_RECORD_KEYS
        .iter()
        .chain(SIMPLE_ID_KEYS.iter())
        .map(|key| (*key, true))
        .chain(std::iter::once((SESSION_RECORD_KEY, false)))
        .collect();
    for (key, persistent) in all_keys {
        let fx = fixture();
        assert!(fx.store.store(&record("ORD-2")));
        if persistent {
            fx.persistent.remove(key).unwrap();
        } else {
            fx.session.remove(key).unwrap();
        }
        let recovered = fx.store.retrieve().expect("record survives");
        assert_eq!(recovered.order_id, OrderId::new("ORD-2"), "after deleting {key}");
        assert!(recovered.source.is_none());
    }
}

#[test]
fn session_copy_wins_when_persistent_primary_is_corrupt() {
    let fx = fixture();
    assert!(fx.store.store(&record("ORD-3")));
    fx.persistent.set("cashfree_order", "{broken").unwrap();
    fx.session.set("cashfree_order", r#"{"order_id":"ORD-SESSION"}"#).unwrap();

    let recovered = fx.store.retrieve().unwrap();

    assert_eq!(recovered.order_id, OrderId::new("ORD-SESSION"));
    assert_eq!(fx.audit.count("store_record_malformed"), 1);
}

#[test]
fn simple_key_fallback_synthesizes_minimal_record() {
    let fx = fixture();
    fx.persistent.set("cashfree_order_id", "ORD-4").unwrap();
    fx.persistent.set("last_order_id", "ORD-OLDER").unwrap();

    let recovered = fx.store.retrieve().unwrap();

    assert_eq!(recovered.order_id, OrderId::new("ORD-4"));
    assert_eq!(recovered.source.as_deref(), Some(SIMPLE_STORAGE_SOURCE));
    assert_eq!(fx.store.get_id(), Some(OrderId::new("ORD-4")));
}

#[test]
fn blank_ids_are_never_returned() {
    let fx = fixture();
    fx.persistent.set("cashfree_order", r#"{"order_id":""}"#).unwrap();
    fx.persistent.set("order_id", "   ").unwrap();

    assert_eq!(fx.store.retrieve(), None);
    assert!(!fx.store.exists());
}

// ============================================================================
// SECTION: Degradation
// ============================================================================

#[test]
fn unavailable_persistent_backend_still_stores_session_copy() {
    let fx = fixture();
    fx.persistent.set_unavailable(true);

    assert!(fx.store.store(&record("ORD-5")));
    assert_eq!(fx.store.get_id(), Some(OrderId::new("ORD-5")));
    assert_eq!(fx.audit.count("store_write_failed"), 7);
}

#[test]
fn both_backends_unavailable_reports_failure_without_error() {
    let fx = fixture();
    fx.persistent.set_unavailable(true);
    fx.session.set_unavailable(true);

    assert!(!fx.store.store(&record("ORD-6")));
    assert_eq!(fx.store.retrieve(), None);
    assert!(!fx.store.cleanup(false));
}

// ============================================================================
// SECTION: Cleanup
// ============================================================================

#[test]
fn cleanup_removes_everything() {
    let fx = fixture();
    assert!(fx.store.store(&record("ORD-7")));

    assert!(fx.store.cleanup(false));

    assert!(fx.persistent.keys().unwrap().is_empty());
    assert!(fx.session.keys().unwrap().is_empty());
    assert!(!fx.store.exists());
}

#[test]
fn cleanup_can_keep_only_the_basic_id() {
    let fx = fixture();
    assert!(fx.store.store(&record("ORD-8")));

    assert!(fx.store.cleanup(true));

    assert_eq!(fx.persistent.keys().unwrap(), vec!["order_id".to_string()]);
    let recovered = fx.store.retrieve().unwrap();
    assert_eq!(recovered.order_id, OrderId::new("ORD-8"));
    assert_eq!(recovered.source.as_deref(), Some(SIMPLE_STORAGE_SOURCE));
}
