// crates/storefront-tracking/src/sink/meta.rs
// ============================================================================
// Module: Meta Pixel Sink
// Description: Adapter translating commerce events into fbq calls.
// Purpose: Report conversions with Meta Pixel standard events.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Standard events go through `fbq("track", ...)`; free-form events use
//! `fbq("trackCustom", ...)`. Purchases carry the transaction id as the
//! `eventID` option so server-side deduplication can match them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::event::CommerceEvent;
use crate::event::LineItem;
use crate::event::items_value;
use crate::hook::HookCall;
use crate::hook::TrackingHook;
use crate::sink::AnalyticsSink;
use crate::sink::HookBinding;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Meta Pixel sink.
pub struct MetaPixelSink {
    /// Hook binding for `fbq`.
    binding: HookBinding,
    /// Pixel id.
    pixel_id: String,
}

impl MetaPixelSink {
    /// Sink name.
    pub const NAME: &'static str = "meta_pixel";

    /// Creates the sink over an `fbq` hook.
    #[must_use]
    pub fn new(hook: Arc<dyn TrackingHook>, pixel_id: impl Into<String>) -> Self {
        let pixel_id = pixel_id.into();
        let setup = HookCall::new("init", pixel_id.clone(), Value::Null);
        Self {
            binding: HookBinding::new(Self::NAME, hook, vec![setup]),
            pixel_id,
        }
    }

    /// Returns the pixel id.
    #[must_use]
    pub fn pixel_id(&self) -> &str {
        &self.pixel_id
    }
}

#[async_trait]
impl AnalyticsSink for MetaPixelSink {
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
        self.binding.dispatch_all(&[pixel_call(event)])
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Returns the `fbq` call for `event`.
fn pixel_call(event: &CommerceEvent) -> HookCall {
    match event {
        CommerceEvent::PageView {
            ..
        } => HookCall::new("track", "PageView", json!({})),
        CommerceEvent::ViewContent {
            product,
            currency,
        } => HookCall::new(
            "track",
            "ViewContent",
            json!({
                "content_ids": [product.id],
                "content_name": product.name,
                "content_category": product.category,
                "content_type": "product",
                "value": product.price.unwrap_or(0.0),
                "currency": currency,
            }),
        ),
        CommerceEvent::AddToCart {
            item,
            currency,
        } => HookCall::new(
            "track",
            "AddToCart",
            json!({
                "content_ids": [item.product.id],
                "content_name": item.product.name,
                "content_type": "product",
                "contents": contents(std::slice::from_ref(item)),
                "value": item.total(),
                "currency": currency,
            }),
        ),
        CommerceEvent::InitiateCheckout {
            items,
            value,
            currency,
        } => HookCall::new(
            "track",
            "InitiateCheckout",
            json!({
                "content_ids": content_ids(items),
                "contents": contents(items),
                "num_items": num_items(items),
                "value": value,
                "currency": currency,
            }),
        ),
        CommerceEvent::Purchase(purchase) => HookCall::new(
            "track",
            "Purchase",
            json!({
                "content_ids": content_ids(&purchase.items),
                "contents": contents(&purchase.items),
                "content_type": "product",
                "num_items": num_items(&purchase.items),
                "value": purchase.value,
                "currency": purchase.currency,
            }),
        )
        .with_options(json!({"eventID": purchase.transaction_id.as_str()})),
        CommerceEvent::AddToWishlist {
            product,
            currency,
        } => HookCall::new(
            "track",
            "AddToWishlist",
            json!({
                "content_ids": [product.id],
                "content_name": product.name,
                "value": items_value(&[LineItem {
                    product: product.clone(),
                    quantity: 1,
                }]),
                "currency": currency,
            }),
        ),
        CommerceEvent::Search {
            query,
        } => HookCall::new("track", "Search", json!({"search_string": query})),
        CommerceEvent::Custom {
            name,
            params,
        } => HookCall::new("trackCustom", name.clone(), Value::Object(params.clone())),
    }
}

/// Returns product ids for `items`.
fn content_ids(items: &[LineItem]) -> Value {
    Value::Array(items.iter().map(|item| json!(item.product.id)).collect())
}

/// Returns the `contents` array for `items`.
fn contents(items: &[LineItem]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| {
                json!({
                    "id": item.product.id,
                    "quantity": item.quantity,
                    "item_price": item.product.price,
                })
            })
            .collect(),
    )
}

/// Total units across `items`.
fn num_items(items: &[LineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}
