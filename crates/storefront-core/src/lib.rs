// crates/storefront-core/src/lib.rs
// ============================================================================
// Module: Storefront Core Library
// Description: Public API surface for the storefront checkout pipeline core.
// Purpose: Expose order types, collaborator interfaces, audit logging, and runtime helpers.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Storefront core holds the types shared by the post-payment pipeline: order
//! identities, stored order records, verification results, and the narrow
//! interfaces through which the pipeline reaches its external collaborators
//! (key/value stores, the verify backend, and navigation). Components depend on
//! these traits rather than on concrete singletons so tests can substitute doubles.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use self::core::*;
pub use interfaces::KeyValueStore;
pub use interfaces::Navigator;
pub use interfaces::OrderVerifier;
pub use interfaces::OutboundError;
pub use interfaces::Redirect;
pub use interfaces::StorageError;
pub use interfaces::View;
pub use runtime::InMemoryKeyValueStore;
pub use runtime::RecordingNavigator;
