// crates/storefront-tracking/src/lib.rs
// ============================================================================
// Module: Storefront Tracking Library
// Description: Conversion tracking orchestrator, analytics sinks, and dedup.
// Purpose: Report storefront commerce events to several analytics vendors.
// Dependencies: storefront-core, storefront-gateway, async-trait, rand, tokio
// ============================================================================

//! ## Overview
//! [`TrackingOrchestrator`] accepts commerce events, drops duplicates, and fans
//! each surviving event out to every [`AnalyticsSink`]. Vendor globals are
//! modeled as [`TrackingHook`] implementations so sinks can be driven by
//! callbacks, channels, or lazily loaded scripts.
//! Invariants:
//! - A purchase with a given transaction id is forwarded at most once inside
//!   the purchase window, across orchestrators sharing one session store.
//! - One sink failing never prevents delivery to the others.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dedup;
pub mod event;
pub mod hook;
pub mod orchestrator;
pub mod sink;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dedup::PurchaseCache;
pub use dedup::PurchaseRecord;
pub use dedup::RecentEvents;
pub use event::CommerceEvent;
pub use event::LineItem;
pub use event::Product;
pub use event::Purchase;
pub use event::PurchaseInput;
pub use hook::CallbackHook;
pub use hook::ChannelHook;
pub use hook::HookCall;
pub use hook::LazyHook;
pub use hook::TrackingHook;
pub use orchestrator::DEFAULT_CURRENCY;
pub use orchestrator::DEFAULT_EVENT_CATEGORY;
pub use orchestrator::DispatchReport;
pub use orchestrator::PURCHASE_CACHE_KEY;
pub use orchestrator::TrackOutcome;
pub use orchestrator::TrackingConfig;
pub use orchestrator::TrackingOrchestrator;
pub use sink::AnalyticsSink;
pub use sink::GoogleAnalyticsSink;
pub use sink::HookBinding;
pub use sink::MetaPixelSink;
pub use sink::SinkError;
pub use sink::TagManagerSink;
