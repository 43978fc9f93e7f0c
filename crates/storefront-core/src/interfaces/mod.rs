// crates/storefront-core/src/interfaces/mod.rs
// ============================================================================
// Module: Storefront Interfaces
// Description: Collaborator traits for storage, verification, and navigation.
// Purpose: Let pipeline components depend on capabilities instead of singletons.
// Dependencies: async-trait, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The checkout pipeline talks to three kinds of external collaborator: client
//! key/value stores, the backend verify endpoint, and the navigation layer that
//! performs redirects. Each is a small trait here so production adapters and
//! test doubles are interchangeable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::form_urlencoded;

use crate::core::OrderId;
use crate::core::VerificationResult;

// ============================================================================
// SECTION: Key/Value Stores
// ============================================================================

/// Key/value storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage is disabled or not available in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Storage quota exceeded.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),
    /// Backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String-keyed storage holding JSON-serialized values.
///
/// Two flavors exist in a deployment: a persistent store that survives
/// restarts and a session-scoped store cleared at session end.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key` when present.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be updated.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// SECTION: Outbound Calls
// ============================================================================

/// Failures of outbound calls (verify requests, sink dispatches).
///
/// # Invariants
/// - Display strings are matched against the gateway suppression list, so
///   transport-level variants keep recognizable wording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutboundError {
    /// Network-level failure (DNS, connection, blocked request).
    #[error("network error: {0}")]
    Network(String),
    /// The call exceeded its deadline and was aborted.
    #[error("request timed out after {after_ms}ms")]
    Timeout {
        /// Deadline that was exceeded, in milliseconds.
        after_ms: u64,
    },
    /// The call was aborted before completion.
    #[error("request aborted: {0}")]
    Aborted(String),
    /// The remote endpoint returned a non-success status without a usable body.
    #[error("http status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },
    /// The response could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The request could not be constructed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Remote collaborator that confirms an order's payment status.
#[async_trait]
pub trait OrderVerifier: Send + Sync {
    /// Verifies the payment status of `order_id`.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on transport or parse failures.
    async fn verify(&self, order_id: &OrderId) -> Result<VerificationResult, OutboundError>;
}

// ============================================================================
// SECTION: Navigation
// ============================================================================

/// Redirect destinations used by the checkout pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Order confirmation view.
    Confirmation,
    /// Shopping cart view.
    Cart,
}

/// One navigation decision.
///
/// # Invariants
/// - `query` preserves insertion order so redirects are deterministic.
/// - `state` carries payloads too rich for the query string.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Redirect {
    /// Destination view.
    pub view: View,
    /// Path of the destination view.
    pub path: String,
    /// Ordered query parameters.
    pub query: Vec<(String, String)>,
    /// Out-of-band navigation state.
    pub state: Value,
    /// Replace the current history entry instead of pushing.
    pub replace: bool,
}

impl Redirect {
    /// Returns the first query value for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    /// Returns `path?query` with form-encoded parameters.
    #[must_use]
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.query {
            serializer.append_pair(name, value);
        }
        format!("{}?{}", self.path, serializer.finish())
    }
}

/// Navigation layer that performs redirects.
pub trait Navigator: Send + Sync {
    /// Navigates to the redirect target.
    fn navigate(&self, redirect: &Redirect);
}
