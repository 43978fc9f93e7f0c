// crates/storefront-core/src/runtime/mod.rs
// ============================================================================
// Module: Storefront Runtime Helpers
// Description: In-process collaborator implementations.
// Purpose: Provide dependency-free stores and navigators for tests and tools.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime helpers implement the core interfaces entirely in memory.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod navigator;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use navigator::RecordingNavigator;
pub use store::InMemoryKeyValueStore;
