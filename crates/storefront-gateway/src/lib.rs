// crates/storefront-gateway/src/lib.rs
// ============================================================================
// Module: Storefront Gateway Library
// Description: Rate- and concurrency-limited gateway for outbound calls.
// Purpose: Keep outbound traffic under host flood protection and absorb benign failures.
// Dependencies: storefront-core, reqwest, tokio, url
// ============================================================================

//! ## Overview
//! [`ThrottleGateway`] is the single path for outbound calls in the checkout
//! pipeline: verify requests and analytics dispatches alike. It spaces
//! executions, caps concurrency, debounces keyed batches, and swallows failures
//! that callers cannot act on. [`HttpOrderVerifier`] is the HTTP adapter for the
//! backend verify endpoint.
//! Invariants:
//! - Every submitted call settles; none is dropped silently except by suppression.
//! - Executions are admitted in FIFO order.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod gateway;
pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gateway::DEFAULT_SUPPRESSED_ERRORS;
pub use gateway::GatewayStats;
pub use gateway::Outcome;
pub use gateway::ThrottleConfig;
pub use gateway::ThrottleGateway;
pub use http::HttpOrderVerifier;
pub use http::HttpVerifierConfig;
