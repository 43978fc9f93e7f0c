// crates/storefront-tracking/src/hook/channel.rs
// ============================================================================
// Module: Channel Tracking Hook
// Description: Hook that forwards calls into a Tokio channel.
// Purpose: Hand analytics calls to an asynchronous forwarder task.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`ChannelHook`] is present while its receiver is alive. Dispatch never
//! blocks: a full or closed channel fails the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::hook::HookCall;
use crate::hook::TrackingHook;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Channel Hook
// ============================================================================

/// Channel-based tracking hook.
#[derive(Debug, Clone)]
pub struct ChannelHook {
    /// Sender used to forward calls.
    sender: Sender<HookCall>,
}

impl ChannelHook {
    /// Creates a hook forwarding into `sender`.
    #[must_use]
    pub const fn new(sender: Sender<HookCall>) -> Self {
        Self {
            sender,
        }
    }
}

#[async_trait]
impl TrackingHook for ChannelHook {
    fn is_present(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn load(&self) -> Result<(), SinkError> {
        if self.sender.is_closed() {
            return Err(SinkError::LoadFailed("channel receiver dropped".to_string()));
        }
        Ok(())
    }

    async fn wait_loaded(&self) {}

    fn dispatch(&self, call: &HookCall) -> Result<(), SinkError> {
        self.sender
            .try_send(call.clone())
            .map_err(|err| SinkError::DispatchFailed(err.to_string()))
    }
}
