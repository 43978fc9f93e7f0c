// crates/storefront-tracking/src/dedup.rs
// ============================================================================
// Module: Tracking Deduplication
// Description: Time-windowed dedup map and durable purchase idempotency cache.
// Purpose: Keep repeated UI events and reloads from double-counting conversions.
// Dependencies: serde, serde_json, storefront-core
// ============================================================================

//! ## Overview
//! [`RecentEvents`] is an in-memory map from event key to last-seen time,
//! evicted by age on every access. [`PurchaseCache`] is the serialized
//! per-transaction record kept in session storage so a reload of the
//! confirmation view does not report the purchase twice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use storefront_core::Timestamp;
use storefront_core::TransactionId;

// ============================================================================
// SECTION: Recent Events
// ============================================================================

/// Last-seen times keyed by `event-type:entity-id[:quantity]`.
#[derive(Debug, Default)]
pub struct RecentEvents {
    /// Last-seen time per key.
    entries: HashMap<String, Timestamp>,
}

impl RecentEvents {
    /// Records `key` at `now` unless it was seen within `window`.
    ///
    /// Entries older than `max_age` are evicted first. Returns true when the
    /// event is new and was recorded.
    pub fn check_and_record(
        &mut self,
        key: String,
        now: Timestamp,
        window: Duration,
        max_age: Duration,
    ) -> bool {
        self.entries.retain(|_, seen| now.within(*seen, max_age));
        if self.entries.get(&key).is_some_and(|seen| now.within(*seen, window)) {
            return false;
        }
        self.entries.insert(key, now);
        true
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Purchase Cache
// ============================================================================

/// Durable record of one reported purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Order total.
    pub value: f64,
    /// Currency.
    pub currency: String,
    /// Report time.
    pub timestamp: Timestamp,
    /// Number of line items.
    pub item_count: usize,
}

/// Reported purchases keyed by transaction id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseCache {
    /// Records per transaction id.
    entries: BTreeMap<TransactionId, PurchaseRecord>,
}

impl PurchaseCache {
    /// Parses a stored cache. Content that is not a JSON object reads as
    /// empty; entries that do not decode are dropped one by one.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(stored) = raw.and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
        else {
            return Self::default();
        };
        let entries = stored
            .into_iter()
            .filter_map(|(id, value)| {
                serde_json::from_value::<PurchaseRecord>(value)
                    .ok()
                    .map(|record| (TransactionId::new(id), record))
            })
            .collect();
        Self {
            entries,
        }
    }

    /// Serializes the cache.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Drops records older than `retention`.
    pub fn prune(&mut self, now: Timestamp, retention: Duration) {
        self.entries.retain(|_, record| now.within(record.timestamp, retention));
    }

    /// Returns true when `transaction_id` was reported within `window`.
    #[must_use]
    pub fn seen_within(&self, transaction_id: &TransactionId, now: Timestamp, window: Duration) -> bool {
        self.entries.get(transaction_id).is_some_and(|record| now.within(record.timestamp, window))
    }

    /// Records a reported purchase. A non-finite value is stored as zero so
    /// the cache stays decodable.
    pub fn record(&mut self, transaction_id: TransactionId, mut record: PurchaseRecord) {
        if !record.value.is_finite() {
            record.value = 0.0;
        }
        self.entries.insert(transaction_id, record);
    }

    /// Returns the record for `transaction_id`.
    #[must_use]
    pub fn get(&self, transaction_id: &TransactionId) -> Option<&PurchaseRecord> {
        self.entries.get(transaction_id)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
