// crates/storefront-core/tests/audit_sinks.rs
// ============================================================================
// Module: Audit Sink Tests
// Description: JSON-lines output of the file and in-memory audit sinks.
// Purpose: Ensure audit records are line-delimited and parseable.
// Dependencies: storefront-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Exercises [`storefront_core::FileAuditSink`] and
//! [`storefront_core::InMemoryAuditSink`].

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use storefront_core::AuditEvent;
use storefront_core::AuditSink;
use storefront_core::FileAuditSink;
use storefront_core::InMemoryAuditSink;
use storefront_core::ManualClock;
use storefront_core::Timestamp;

#[test]
fn file_sink_appends_one_json_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let clock = ManualClock::new(Timestamp::from_unix_millis(42));
    {
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&AuditEvent::at(&clock, "gateway", "gateway_error_suppressed", "dropped"));
        sink.record(
            &AuditEvent::at(&clock, "store", "store_write_failed", "error").subject("order_id"),
        );
    }
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["event"], "store_write_failed");
    assert_eq!(second["subject"], "order_id");
    assert_eq!(second["timestamp_ms"], 42);
}

#[test]
fn in_memory_sink_counts_by_event_name() {
    let sink = InMemoryAuditSink::new();
    sink.record(&AuditEvent::new("tracking", "sink_dispatch_failed", "error"));
    sink.record(&AuditEvent::new("tracking", "sink_dispatch_failed", "error"));
    sink.record(&AuditEvent::new("tracking", "event_deduplicated", "dropped"));
    assert_eq!(sink.count("sink_dispatch_failed"), 2);
    assert_eq!(sink.events().len(), 3);
}
