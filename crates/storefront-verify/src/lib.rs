// crates/storefront-verify/src/lib.rs
// ============================================================================
// Module: Storefront Payment Verification
// Description: Controller for the payment gateway return flow.
// Purpose: Confirm a payment once and route the user deterministically.
// Dependencies: storefront-core, storefront-gateway, storefront-store, url
// ============================================================================

//! ## Overview
//! When the payment gateway redirects back, [`PaymentVerificationController`]
//! extracts the order id from the return URL, asks the verify backend for the
//! payment status through the throttle gateway, and redirects to either the
//! confirmation view or the cart. Every path ends in a terminal state with
//! exactly one redirect.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod controller;
pub mod params;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use controller::PaymentVerificationController;
pub use controller::VerificationState;
pub use controller::VerifyConfig;
pub use params::ORDER_ID_PARAMS;
pub use params::extract_order_id;
pub use params::query_param;
