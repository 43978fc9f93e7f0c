// crates/storefront-store/src/lib.rs
// ============================================================================
// Module: Storefront Redundant Order Store
// Description: Order identity persistence across unreliable key/value backends.
// Purpose: Survive partial storage loss between checkout start and payment return.
// Dependencies: storefront-core, serde_json
// ============================================================================

//! ## Overview
//! [`RedundantOrderStore`] writes the in-flight order under several keys in two
//! backends (persistent and session-scoped) and reads them back in a fixed
//! priority order. Any single surviving copy is enough to recover the order.
//!
//! Invariants:
//! - No operation returns an error; storage failures are audited and skipped.
//! - [`RedundantOrderStore::retrieve`] only returns records with a non-empty order id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use storefront_core::AuditEvent;
use storefront_core::AuditSink;
use storefront_core::KeyValueStore;
use storefront_core::NoopAuditSink;
use storefront_core::OrderId;
use storefront_core::StorageError;
use storefront_core::StoredOrderRecord;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "store";

/// Structured-record keys written to the persistent backend.
pub const PERSISTENT_RECORD_KEYS: [&str; 3] = ["cashfree_order", "pending_order", "current_order"];

/// Structured-record key written to the session backend.
pub const SESSION_RECORD_KEY: &str = "cashfree_order";

/// Single-value keys holding only the order id in the persistent backend.
pub const SIMPLE_ID_KEYS: [&str; 4] = ["order_id", "orderId", "cashfree_order_id", "last_order_id"];

/// Key retained by [`RedundantOrderStore::cleanup`] when asked to keep the bare id.
pub const BASIC_ID_KEY: &str = "order_id";

/// Source label attached to records synthesized from single-value keys.
pub const SIMPLE_STORAGE_SOURCE: &str = "simple_storage";

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Survives browser restarts.
    Persistent,
    /// Scoped to the current tab session.
    Session,
}

impl Backend {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::Session => "session",
        }
    }
}

/// Structured-record read order.
pub const READ_ORDER: [(&str, Backend); 4] = [
    ("cashfree_order", Backend::Persistent),
    ("cashfree_order", Backend::Session),
    ("pending_order", Backend::Persistent),
    ("current_order", Backend::Persistent),
];

// ============================================================================
// SECTION: Store
// ============================================================================

/// Order identity store with redundant copies.
#[derive(Clone)]
pub struct RedundantOrderStore {
    /// Persistent backend.
    persistent: Arc<dyn KeyValueStore>,
    /// Session-scoped backend.
    session: Arc<dyn KeyValueStore>,
    /// Audit sink for storage failures.
    audit: Arc<dyn AuditSink>,
}

impl RedundantOrderStore {
    /// Creates a store over the provided backends.
    #[must_use]
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            session,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Writes the record under every structured key and its id under every
    /// single-value key.
    ///
    /// Returns true when at least one structured copy was written.
    pub fn store(&self, record: &StoredOrderRecord) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(err) => {
                self.audit_failure("store_serialize_failed", record.order_id.as_str(), &err);
                return false;
            }
        };
        let mut structured = 0_usize;
        for key in PERSISTENT_RECORD_KEYS {
            if self.write(Backend::Persistent, key, &payload) {
                structured += 1;
            }
        }
        if self.write(Backend::Session, SESSION_RECORD_KEY, &payload) {
            structured += 1;
        }
        let mut simple = 0_usize;
        for key in SIMPLE_ID_KEYS {
            if self.write(Backend::Persistent, key, record.order_id.as_str()) {
                simple += 1;
            }
        }
        let outcome = if structured > 0 { "ok" } else { "error" };
        self.audit.record(
            &AuditEvent::new(COMPONENT, "order_stored", outcome)
                .subject(record.order_id.as_str())
                .detail(format!("structured={structured} simple={simple}")),
        );
        structured > 0
    }

    /// Returns the first well-formed record in read order, falling back to a
    /// minimal record built from a single-value key.
    #[must_use]
    pub fn retrieve(&self) -> Option<StoredOrderRecord> {
        for (key, backend) in READ_ORDER {
            let Some(raw) = self.read(backend, key) else {
                continue;
            };
            if let Some(record) = StoredOrderRecord::from_json(&raw) {
                return Some(record);
            }
            self.audit.record(
                &AuditEvent::new(COMPONENT, "store_record_malformed", "skipped")
                    .subject(key)
                    .detail(backend.as_str()),
            );
        }
        SIMPLE_ID_KEYS.iter().find_map(|key| {
            let raw = self.read(Backend::Persistent, key)?;
            let order_id = OrderId::parse(&raw)?;
            Some(StoredOrderRecord::minimal(order_id, SIMPLE_STORAGE_SOURCE))
        })
    }

    /// Returns true when any copy of an order can be recovered.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.retrieve().is_some()
    }

    /// Returns the recoverable order id.
    #[must_use]
    pub fn get_id(&self) -> Option<OrderId> {
        self.retrieve().map(|record| record.order_id)
    }

    /// Removes every structured and single-value key.
    ///
    /// With `keep_basic_id`, the recovered order id is re-written under
    /// [`BASIC_ID_KEY`] afterwards. Returns true when every removal succeeded.
    pub fn cleanup(&self, keep_basic_id: bool) -> bool {
        let retained = if keep_basic_id { self.get_id() } else { None };
        let mut clean = true;
        for key in PERSISTENT_RECORD_KEYS.iter().chain(SIMPLE_ID_KEYS.iter()) {
            clean &= self.delete(Backend::Persistent, key);
        }
        clean &= self.delete(Backend::Session, SESSION_RECORD_KEY);
        if let Some(order_id) = &retained {
            clean &= self.write(Backend::Persistent, BASIC_ID_KEY, order_id.as_str());
        }
        self.audit.record(
            &AuditEvent::new(COMPONENT, "order_cleanup", if clean { "ok" } else { "error" })
                .detail(format!("keep_basic_id={keep_basic_id}")),
        );
        clean
    }

    /// Returns the backend handle.
    fn backend(&self, backend: Backend) -> &dyn KeyValueStore {
        match backend {
            Backend::Persistent => self.persistent.as_ref(),
            Backend::Session => self.session.as_ref(),
        }
    }

    /// Writes one key, auditing failures.
    fn write(&self, backend: Backend, key: &str, value: &str) -> bool {
        match self.backend(backend).set(key, value) {
            Ok(()) => true,
            Err(err) => {
                self.audit_storage("store_write_failed", backend, key, &err);
                false
            }
        }
    }

    /// Reads one key, treating failures as absence.
    fn read(&self, backend: Backend, key: &str) -> Option<String> {
        match self.backend(backend).get(key) {
            Ok(value) => value,
            Err(err) => {
                self.audit_storage("store_read_failed", backend, key, &err);
                None
            }
        }
    }

    /// Removes one key, auditing failures.
    fn delete(&self, backend: Backend, key: &str) -> bool {
        match self.backend(backend).remove(key) {
            Ok(()) => true,
            Err(err) => {
                self.audit_storage("store_remove_failed", backend, key, &err);
                false
            }
        }
    }

    /// Records a storage failure.
    fn audit_storage(&self, event: &'static str, backend: Backend, key: &str, err: &StorageError) {
        self.audit.record(
            &AuditEvent::new(COMPONENT, event, "error")
                .subject(key)
                .detail(format!("{}: {err}", backend.as_str())),
        );
    }

    /// Records a non-storage failure.
    fn audit_failure(&self, event: &'static str, subject: &str, err: &serde_json::Error) {
        self.audit.record(
            &AuditEvent::new(COMPONENT, event, "error").subject(subject).detail(err.to_string()),
        );
    }
}
