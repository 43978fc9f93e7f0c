// crates/storefront-store-sqlite/src/lib.rs
// ============================================================================
// Module: Storefront SQLite Key/Value Store
// Description: Durable KeyValueStore backend using SQLite WAL.
// Purpose: Provide a persistent backend for redundant order copies outside a browser.
// Dependencies: storefront-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`storefront_core::KeyValueStore`] used
//! as the persistent backend of the redundant order store in tools and
//! server-side deployments. Database contents are treated as untrusted; values
//! above the size limit are rejected on read and write.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_VALUE_BYTES;
pub use store::SqliteKeyValueStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
