// crates/storefront-tracking/src/sink/gtm.rs
// ============================================================================
// Module: Google Tag Manager Sink
// Description: Adapter translating commerce events into dataLayer pushes.
// Purpose: Feed tag-manager triggers with GA4-shaped e-commerce objects.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Each event becomes `dataLayer.push({event, ...})`. E-commerce events are
//! preceded by `{ecommerce: null}` so the previous object does not bleed into
//! the next trigger.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::event::CommerceEvent;
use crate::hook::HookCall;
use crate::hook::TrackingHook;
use crate::sink::AnalyticsSink;
use crate::sink::HookBinding;
use crate::sink::SinkError;
use crate::sink::ga4::ga4_event;

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Data-layer command name.
const PUSH: &str = "push";

/// Google Tag Manager data-layer sink.
pub struct TagManagerSink {
    /// Hook binding for `dataLayer`.
    binding: HookBinding,
    /// Container id (`GTM-...`).
    container_id: String,
}

impl TagManagerSink {
    /// Sink name.
    pub const NAME: &'static str = "tag_manager";

    /// Creates the sink over a `dataLayer` hook.
    #[must_use]
    pub fn new(hook: Arc<dyn TrackingHook>, container_id: impl Into<String>) -> Self {
        let container_id = container_id.into();
        let setup = HookCall::new(
            PUSH,
            "gtm.js",
            json!({"event": "gtm.js", "gtm.container": container_id}),
        );
        Self {
            binding: HookBinding::new(Self::NAME, hook, vec![setup]),
            container_id,
        }
    }

    /// Returns the container id.
    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }
}

#[async_trait]
impl AnalyticsSink for TagManagerSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn initialize(&self, ready_timeout: Duration) -> Result<(), SinkError> {
        self.binding.initialize(ready_timeout).await
    }

    fn is_ready(&self) -> bool {
        self.binding.is_ready()
    }

    fn auto_fix_ready(&self) -> bool {
        self.binding.auto_fix_ready()
    }

    fn track(&self, event: &CommerceEvent) -> Result<(), SinkError> {
        self.binding.dispatch_all(&data_layer_pushes(event))
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Returns the pushes for `event`.
fn data_layer_pushes(event: &CommerceEvent) -> Vec<HookCall> {
    let (name, params) = ga4_event(event);
    let ecommerce = matches!(
        event,
        CommerceEvent::ViewContent { .. }
            | CommerceEvent::AddToCart { .. }
            | CommerceEvent::InitiateCheckout { .. }
            | CommerceEvent::Purchase(_)
            | CommerceEvent::AddToWishlist { .. }
    );
    if !ecommerce {
        let mut payload = Map::new();
        payload.insert("event".to_string(), json!(name));
        payload.extend(params);
        return vec![HookCall::new(PUSH, name, Value::Object(payload))];
    }
    vec![
        HookCall::new(PUSH, "ecommerce_clear", json!({"ecommerce": null})),
        HookCall::new(PUSH, name.clone(), json!({"event": name, "ecommerce": params})),
    ]
}
