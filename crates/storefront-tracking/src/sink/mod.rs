// crates/storefront-tracking/src/sink/mod.rs
// ============================================================================
// Module: Analytics Sinks
// Description: Sink interface, readiness tracking, and vendor adapters.
// Purpose: Translate commerce events into vendor calls behind one interface.
// Dependencies: async-trait, thiserror, tokio
// ============================================================================

//! ## Overview
//! Every sink implements [`AnalyticsSink`]. The vendor adapters share a
//! [`HookBinding`] that owns the hook and the sink's ready flag:
//! - `initialize` loads the hook when absent, then races its load notification
//!   against the readiness timeout.
//! - `auto_fix_ready` sets the flag when the hook turned out to be present
//!   even though initialization did not observe it.
//!
//! Invariants:
//! - A sink failure never affects other sinks; the orchestrator isolates them.
//! - The vendor setup calls reach the hook exactly once, on whichever path
//!   first makes the sink ready.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod ga4;
mod gtm;
mod meta;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::CommerceEvent;
use crate::hook::HookCall;
use crate::hook::TrackingHook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ga4::GoogleAnalyticsSink;
pub use gtm::TagManagerSink;
pub use meta::MetaPixelSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sink and hook errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The vendor global is not present.
    #[error("tracking hook not present: {0}")]
    NotPresent(String),
    /// The sink has not become ready.
    #[error("sink not ready: {0}")]
    NotReady(String),
    /// The vendor script could not be loaded.
    #[error("tracking hook load failed: {0}")]
    LoadFailed(String),
    /// The vendor global rejected the call.
    #[error("tracking dispatch failed: {0}")]
    DispatchFailed(String),
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Analytics destination.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Returns the sink name used in audit records.
    fn name(&self) -> &'static str;

    /// Loads the vendor hook and waits for readiness up to `ready_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the hook cannot be loaded or does not become
    /// ready in time.
    async fn initialize(&self, ready_timeout: Duration) -> Result<(), SinkError>;

    /// Returns true when the sink accepts events.
    fn is_ready(&self) -> bool;

    /// Marks the sink ready when its hook is present. Returns true when the
    /// flag was changed.
    fn auto_fix_ready(&self) -> bool;

    /// Forwards one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the sink is not ready or the hook rejects
    /// the call.
    fn track(&self, event: &CommerceEvent) -> Result<(), SinkError>;
}

// ============================================================================
// SECTION: Hook Binding
// ============================================================================

/// Hook plus readiness flag shared by the vendor adapters.
pub struct HookBinding {
    /// Sink name for error messages.
    name: &'static str,
    /// Vendor hook.
    hook: Arc<dyn TrackingHook>,
    /// Vendor configuration calls sent before the first event.
    setup: Vec<HookCall>,
    /// Set once a readiness path claimed the setup calls.
    configured: AtomicBool,
    /// Set once the hook is known to be usable.
    ready: AtomicBool,
}

impl HookBinding {
    /// Creates an unready binding that sends `setup` when it becomes ready.
    #[must_use]
    pub fn new(name: &'static str, hook: Arc<dyn TrackingHook>, setup: Vec<HookCall>) -> Self {
        Self {
            name,
            hook,
            setup,
            configured: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        }
    }

    /// Loads the hook if needed and waits for its load notification, then
    /// sends the setup calls unless an earlier path already did.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when loading fails, readiness times out, or a
    /// setup call is rejected.
    pub async fn initialize(&self, ready_timeout: Duration) -> Result<(), SinkError> {
        if !self.hook.is_present() {
            self.hook.load().await?;
            let loaded = tokio::time::timeout(ready_timeout, self.hook.wait_loaded()).await;
            if loaded.is_err() && !self.hook.is_present() {
                return Err(SinkError::NotReady(format!(
                    "{} not loaded after {}ms",
                    self.name,
                    ready_timeout.as_millis()
                )));
            }
        }
        self.configure()?;
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Sends the setup calls once. A rejected call clears the claim so a
    /// later readiness path retries.
    fn configure(&self) -> Result<(), SinkError> {
        if self.configured.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for call in &self.setup {
            if let Err(err) = self.hook.dispatch(call) {
                self.configured.store(false, Ordering::SeqCst);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Returns the ready flag.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Sets the ready flag when the hook is present, sending the setup calls
    /// first. Stays unready when a setup call is rejected.
    pub fn auto_fix_ready(&self) -> bool {
        if self.is_ready() || !self.hook.is_present() || self.configure().is_err() {
            return false;
        }
        !self.ready.swap(true, Ordering::SeqCst)
    }

    /// Dispatches calls in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::NotReady`] before readiness, or the hook's error.
    pub fn dispatch_all(&self, calls: &[HookCall]) -> Result<(), SinkError> {
        if !self.is_ready() {
            return Err(SinkError::NotReady(self.name.to_string()));
        }
        for call in calls {
            self.hook.dispatch(call)?;
        }
        Ok(())
    }
}
