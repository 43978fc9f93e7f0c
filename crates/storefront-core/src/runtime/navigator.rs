// crates/storefront-core/src/runtime/navigator.rs
// ============================================================================
// Module: Storefront Recording Navigator
// Description: Navigator that records redirects instead of performing them.
// Purpose: Observe navigation decisions in tests and headless tools.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`RecordingNavigator`] keeps every redirect it receives, in order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::Navigator;
use crate::interfaces::Redirect;

// ============================================================================
// SECTION: Recording Navigator
// ============================================================================

/// Navigator that records redirects.
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    /// Redirects received so far.
    redirects: Arc<Mutex<Vec<Redirect>>>,
}

impl RecordingNavigator {
    /// Creates an empty navigator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded redirects.
    #[must_use]
    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns the most recent redirect.
    #[must_use]
    pub fn last(&self) -> Option<Redirect> {
        self.redirects.lock().ok().and_then(|guard| guard.last().cloned())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, redirect: &Redirect) {
        if let Ok(mut guard) = self.redirects.lock() {
            guard.push(redirect.clone());
        }
    }
}
