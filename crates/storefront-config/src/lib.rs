// crates/storefront-config/src/lib.rs
// ============================================================================
// Module: Storefront Config Library
// Description: Canonical config model and validation for storefront.toml.
// Purpose: Single source of truth for storefront.toml semantics.
// Dependencies: storefront-gateway, storefront-tracking, storefront-verify, serde, toml
// ============================================================================

//! ## Overview
//! `storefront-config` defines the configuration model for the checkout
//! pipeline. Loading is strict and fail-closed; each section converts into
//! the runtime config of the crate that owns it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
