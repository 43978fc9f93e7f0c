// crates/storefront-tracking/src/hook/mod.rs
// ============================================================================
// Module: Tracking Hooks
// Description: Interface to a host analytics global and reference implementations.
// Purpose: Decouple sink adapters from how the vendor script is loaded and called.
// Dependencies: async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! A [`TrackingHook`] models one vendor global (`gtag`, `fbq`, or `dataLayer`):
//! whether it is present, how to load it, how to await its load notification,
//! and how to dispatch one call into it.
//!
//! Reference hooks:
//! - [`CallbackHook`] invokes a handler synchronously.
//! - [`ChannelHook`] forwards calls into a Tokio mpsc channel.
//! - [`LazyHook`] gates an inner hook on an explicit load signal.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod callback;
mod channel;
mod lazy;

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::sink::SinkError;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use callback::CallbackHook;
pub use channel::ChannelHook;
pub use lazy::LazyHook;

// ============================================================================
// SECTION: Hook Calls
// ============================================================================

/// One call into a vendor global, such as `gtag("event", name, payload)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookCall {
    /// Leading command argument (`event`, `track`, `trackCustom`, `push`, ...).
    pub command: String,
    /// Event or target name.
    pub name: String,
    /// Call payload.
    pub payload: Value,
    /// Trailing options object (`null` when absent).
    pub options: Value,
}

impl HookCall {
    /// Creates a call without trailing options.
    #[must_use]
    pub fn new(command: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            name: name.into(),
            payload,
            options: Value::Null,
        }
    }

    /// Attaches trailing options.
    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

// ============================================================================
// SECTION: Hook Trait
// ============================================================================

/// Host analytics global.
#[async_trait]
pub trait TrackingHook: Send + Sync {
    /// Returns true when the global is present and callable.
    fn is_present(&self) -> bool;

    /// Requests that the vendor script be loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::LoadFailed`] when the load cannot be requested.
    async fn load(&self) -> Result<(), SinkError>;

    /// Resolves once the vendor script reports that it has loaded.
    async fn wait_loaded(&self);

    /// Dispatches one call into the global.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the global is absent or rejects the call.
    fn dispatch(&self, call: &HookCall) -> Result<(), SinkError>;
}
