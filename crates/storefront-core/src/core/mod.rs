// crates/storefront-core/src/core/mod.rs
// ============================================================================
// Module: Storefront Core Types
// Description: Identifiers, time values, and order records.
// Purpose: Group the serializable data model shared across pipeline crates.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Data model for the checkout pipeline. Everything here is plain data; behavior
//! lives in the component crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod order;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::identifiers::OrderId;
pub use self::identifiers::TransactionId;
pub use self::order::PAID_STATUS;
pub use self::order::StoredOrderRecord;
pub use self::order::VerificationResult;
pub use self::time::Clock;
pub use self::time::ManualClock;
pub use self::time::SystemClock;
pub use self::time::Timestamp;
