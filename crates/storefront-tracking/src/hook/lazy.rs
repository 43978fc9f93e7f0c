// crates/storefront-tracking/src/hook/lazy.rs
// ============================================================================
// Module: Lazy Tracking Hook
// Description: Hook whose presence is gated on an explicit load signal.
// Purpose: Model vendor scripts that appear some time after injection.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`LazyHook`] wraps another hook and reports absent until
//! [`LazyHook::mark_loaded`] is called, which also wakes every
//! [`TrackingHook::wait_loaded`] waiter. `load` only records that a load was
//! requested.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::hook::HookCall;
use crate::hook::TrackingHook;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Lazy Hook
// ============================================================================

/// Shared load state.
#[derive(Default)]
struct LoadSignal {
    /// Set once the script has loaded.
    loaded: AtomicBool,
    /// Number of load requests received.
    requests: AtomicUsize,
    /// Wakes load waiters.
    notify: Notify,
}

/// Tracking hook gated on a load signal.
#[derive(Clone)]
pub struct LazyHook {
    /// Hook used once loaded.
    inner: Arc<dyn TrackingHook>,
    /// Load state shared across clones.
    signal: Arc<LoadSignal>,
}

impl LazyHook {
    /// Wraps `inner`; the hook starts unloaded.
    #[must_use]
    pub fn new(inner: Arc<dyn TrackingHook>) -> Self {
        Self {
            inner,
            signal: Arc::new(LoadSignal::default()),
        }
    }

    /// Marks the script as loaded and wakes waiters.
    pub fn mark_loaded(&self) {
        self.signal.loaded.store(true, Ordering::SeqCst);
        self.signal.notify.notify_waiters();
    }

    /// Returns how many times a load was requested.
    #[must_use]
    pub fn load_requests(&self) -> usize {
        self.signal.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackingHook for LazyHook {
    fn is_present(&self) -> bool {
        self.signal.loaded.load(Ordering::SeqCst) && self.inner.is_present()
    }

    async fn load(&self) -> Result<(), SinkError> {
        self.signal.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_loaded(&self) {
        loop {
            let notified = self.signal.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.signal.loaded.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    fn dispatch(&self, call: &HookCall) -> Result<(), SinkError> {
        if !self.signal.loaded.load(Ordering::SeqCst) {
            return Err(SinkError::NotPresent("script not loaded".to_string()));
        }
        self.inner.dispatch(call)
    }
}
