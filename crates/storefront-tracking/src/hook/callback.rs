// crates/storefront-tracking/src/hook/callback.rs
// ============================================================================
// Module: Callback Tracking Hook
// Description: Hook that invokes a user-provided handler.
// Purpose: Bridge sink adapters to an in-process analytics client.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`CallbackHook`] is always present and loaded; every dispatch calls the
//! handler synchronously and returns its result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use crate::hook::HookCall;
use crate::hook::TrackingHook;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Callback Hook
// ============================================================================

/// Handler signature used by the hook.
type CallbackHandler = dyn Fn(&HookCall) -> Result<(), SinkError> + Send + Sync;

/// Callback-based tracking hook.
#[derive(Clone)]
pub struct CallbackHook {
    /// Handler invoked with each call.
    handler: Arc<CallbackHandler>,
}

impl CallbackHook {
    /// Creates a hook from a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HookCall) -> Result<(), SinkError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl TrackingHook for CallbackHook {
    fn is_present(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn wait_loaded(&self) {}

    fn dispatch(&self, call: &HookCall) -> Result<(), SinkError> {
        (self.handler)(call)
    }
}
