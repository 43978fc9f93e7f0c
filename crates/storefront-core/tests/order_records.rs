// crates/storefront-core/tests/order_records.rs
// ============================================================================
// Module: Order Record Tests
// Description: Parsing rules for stored order records and verify results.
// Purpose: Ensure lenient legacy parsing without accepting blank order ids.
// Dependencies: storefront-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises [`storefront_core::StoredOrderRecord`] and
//! [`storefront_core::VerificationResult`] helpers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::time::Duration;

use serde_json::json;
use storefront_core::OrderId;
use storefront_core::Redirect;
use storefront_core::StoredOrderRecord;
use storefront_core::Timestamp;
use storefront_core::VerificationResult;
use storefront_core::View;

// ============================================================================
// SECTION: Stored Records
// ============================================================================

#[test]
fn record_parses_numeric_string_amount_and_missing_created_at() {
    let raw = r#"{"order_id":"ORD-1","order_amount":"499.50","cf_order_id":"cf_9"}"#;
    let record = StoredOrderRecord::from_json(raw).expect("record");
    assert_eq!(record.order_id, OrderId::new("ORD-1"));
    assert_eq!(record.order_amount, Some(499.5));
    assert_eq!(record.cf_order_id.as_deref(), Some("cf_9"));
    assert_eq!(record.created_at, Timestamp::default());
}

#[test]
fn record_rejects_blank_or_missing_order_id() {
    assert!(StoredOrderRecord::from_json(r#"{"order_id":"   "}"#).is_none());
    assert!(StoredOrderRecord::from_json(r#"{"cf_order_id":"cf_1"}"#).is_none());
    assert!(StoredOrderRecord::from_json(r#""ORD-1""#).is_none());
    assert!(StoredOrderRecord::from_json("{not json").is_none());
}

#[test]
fn record_roundtrip_omits_absent_fields() {
    let record = StoredOrderRecord::new(OrderId::new("ORD-2"), Timestamp::from_unix_millis(10));
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value, json!({"order_id": "ORD-2", "created_at": 10}));
}

#[test]
fn order_id_parse_trims_and_rejects_blank() {
    assert_eq!(OrderId::parse("  A1 "), Some(OrderId::new("A1")));
    assert_eq!(OrderId::parse("   "), None);
}

// ============================================================================
// SECTION: Verification Results
// ============================================================================

#[test]
fn verification_result_requires_success_and_paid() {
    let paid: VerificationResult =
        serde_json::from_value(json!({"success": true, "status": "PAID"})).unwrap();
    assert!(paid.is_paid());
    let unpaid: VerificationResult =
        serde_json::from_value(json!({"success": true, "status": "ACTIVE"})).unwrap();
    assert!(!unpaid.is_paid());
    let failed_call: VerificationResult =
        serde_json::from_value(json!({"success": false, "status": "PAID"})).unwrap();
    assert!(!failed_call.is_paid());
}

#[test]
fn verification_result_exposes_amount_and_currency() {
    let result: VerificationResult = serde_json::from_value(json!({
        "success": true,
        "status": "PAID",
        "order": {"order_amount": 1250, "order_currency": "INR"}
    }))
    .unwrap();
    assert_eq!(result.amount().as_deref(), Some("1250"));
    assert_eq!(result.currency().as_deref(), Some("INR"));
}

// ============================================================================
// SECTION: Time and Redirects
// ============================================================================

#[test]
fn timestamp_window_is_exclusive_of_its_end() {
    let start = Timestamp::from_unix_millis(1_000);
    assert!(Timestamp::from_unix_millis(2_999).within(start, Duration::from_secs(2)));
    assert!(!Timestamp::from_unix_millis(3_000).within(start, Duration::from_secs(2)));
    assert_eq!(Timestamp::from_unix_millis(0).to_rfc3339(), "1970-01-01T00:00:00Z");
}

#[test]
fn redirect_location_encodes_query_in_order() {
    let redirect = Redirect {
        view: View::Cart,
        path: "/cart".to_string(),
        query: vec![
            ("error".to_string(), "payment_failed".to_string()),
            ("order_id".to_string(), "A B".to_string()),
        ],
        state: serde_json::Value::Null,
        replace: true,
    };
    assert_eq!(redirect.location(), "/cart?error=payment_failed&order_id=A+B");
    assert_eq!(redirect.query_value("order_id"), Some("A B"));
}
