// crates/storefront-core/src/audit.rs
// ============================================================================
// Module: Storefront Audit Logging
// Description: Structured audit events for the checkout pipeline.
// Purpose: Emit JSON-lines diagnostics without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every component reports notable transitions (suppressed errors, storage
//! failures, verification outcomes, sink failures) as [`AuditEvent`] values
//! through an [`AuditSink`]. Sinks are deliberately small so deployments can
//! route events to their own pipeline. Events never carry customer details or
//! payment credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::Clock;
use crate::core::SystemClock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Event identifier (for example `gateway_error_suppressed`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Emitting component label.
    pub component: &'static str,
    /// Outcome label (`ok`, `dropped`, `error`, ...).
    pub outcome: &'static str,
    /// Subject identifier (order id, transaction id, storage key, sink name).
    pub subject: Option<String>,
    /// Free-form detail message.
    pub detail: Option<String>,
}

impl AuditEvent {
    /// Creates an event stamped with the system clock.
    #[must_use]
    pub fn new(component: &'static str, event: &'static str, outcome: &'static str) -> Self {
        Self::at(&SystemClock, component, event, outcome)
    }

    /// Creates an event stamped with the provided clock.
    #[must_use]
    pub fn at(
        clock: &dyn Clock,
        component: &'static str,
        event: &'static str,
        outcome: &'static str,
    ) -> Self {
        Self {
            event,
            timestamp_ms: clock.now().as_unix_millis(),
            component,
            outcome,
            subject: None,
            detail: None,
        }
    }

    /// Attaches a subject identifier.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for pipeline events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink writing JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink appending JSON lines to a file.
pub struct FileAuditSink {
    /// File handle protected by a mutex.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log in append mode, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut guard) = self.file.lock()
        {
            let _ = writeln!(guard, "{payload}");
        }
    }
}

/// No-op audit sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Audit sink keeping events in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditSink {
    /// Recorded events.
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns the number of recorded events named `event`.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .map(|guard| guard.iter().filter(|entry| entry.event == event).count())
            .unwrap_or(0)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
