// crates/storefront-tracking/src/sink/ga4.rs
// ============================================================================
// Module: Google Analytics 4 Sink
// Description: Adapter translating commerce events into gtag calls.
// Purpose: Report conversions with GA4 recommended event names.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Events become `gtag("event", <name>, <params>)` using the GA4 e-commerce
//! schema. The same parameter objects are reused by the data-layer sink.

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
use crate::event::LineItem;
use crate::event::Product;
use crate::event::items_value;
use crate::hook::HookCall;
use crate::hook::TrackingHook;
use crate::sink::AnalyticsSink;
use crate::sink::HookBinding;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Google Analytics 4 sink.
pub struct GoogleAnalyticsSink {
    /// Hook binding for `gtag`.
    binding: HookBinding,
    /// GA4 measurement id (`G-...`).
    measurement_id: String,
}

impl GoogleAnalyticsSink {
    /// Sink name.
    pub const NAME: &'static str = "google_analytics";

    /// Creates the sink over a `gtag` hook.
    #[must_use]
    pub fn new(hook: Arc<dyn TrackingHook>, measurement_id: impl Into<String>) -> Self {
        let measurement_id = measurement_id.into();
        let setup =
            HookCall::new("config", measurement_id.clone(), json!({"send_page_view": false}));
        Self {
            binding: HookBinding::new(Self::NAME, hook, vec![setup]),
            measurement_id,
        }
    }

    /// Returns the measurement id.
    #[must_use]
    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }
}

#[async_trait]
impl AnalyticsSink for GoogleAnalyticsSink {
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
        let (name, params) = ga4_event(event);
        self.binding.dispatch_all(&[HookCall::new("event", name, Value::Object(params))])
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Returns the GA4 event name and parameters for `event`.
pub(crate) fn ga4_event(event: &CommerceEvent) -> (String, Map<String, Value>) {
    match event {
        CommerceEvent::PageView {
            path,
            title,
        } => {
            let mut params = Map::new();
            params.insert("page_path".to_string(), json!(path));
            insert_opt(&mut params, "page_title", title.as_ref().map(|title| json!(title)));
            ("page_view".to_string(), params)
        }
        CommerceEvent::ViewContent {
            product,
            currency,
        } => ("view_item".to_string(), single_item(product, 1, currency)),
        CommerceEvent::AddToCart {
            item,
            currency,
        } => ("add_to_cart".to_string(), single_item(&item.product, item.quantity, currency)),
        CommerceEvent::AddToWishlist {
            product,
            currency,
        } => ("add_to_wishlist".to_string(), single_item(product, 1, currency)),
        CommerceEvent::InitiateCheckout {
            items,
            value,
            currency,
        } => {
            let mut params = Map::new();
            params.insert("currency".to_string(), json!(currency));
            params.insert("value".to_string(), json!(value));
            params.insert("items".to_string(), ga4_items(items));
            ("begin_checkout".to_string(), params)
        }
        CommerceEvent::Purchase(purchase) => {
            let mut params = Map::new();
            params.insert("transaction_id".to_string(), json!(purchase.transaction_id.as_str()));
            params.insert("value".to_string(), json!(purchase.value));
            params.insert("currency".to_string(), json!(purchase.currency));
            insert_opt(&mut params, "tax", purchase.tax.map(|tax| json!(tax)));
            insert_opt(&mut params, "shipping", purchase.shipping.map(|shipping| json!(shipping)));
            insert_opt(&mut params, "coupon", purchase.coupon.as_ref().map(|coupon| json!(coupon)));
            params.insert("items".to_string(), ga4_items(&purchase.items));
            ("purchase".to_string(), params)
        }
        CommerceEvent::Search {
            query,
        } => {
            let mut params = Map::new();
            params.insert("search_term".to_string(), json!(query));
            ("search".to_string(), params)
        }
        CommerceEvent::Custom {
            name,
            params,
        } => (name.clone(), params.clone()),
    }
}

/// Builds the GA4 `items` array.
pub(crate) fn ga4_items(items: &[LineItem]) -> Value {
    Value::Array(items.iter().map(|item| ga4_item(&item.product, item.quantity)).collect())
}

/// Builds one GA4 item object.
fn ga4_item(product: &Product, quantity: u32) -> Value {
    let mut item = Map::new();
    item.insert("item_id".to_string(), json!(product.id));
    item.insert("item_name".to_string(), json!(product.name));
    insert_opt(&mut item, "item_category", product.category.as_ref().map(|c| json!(c)));
    insert_opt(&mut item, "price", product.price.map(|price| json!(price)));
    item.insert("quantity".to_string(), json!(quantity));
    Value::Object(item)
}

/// Builds parameters for a single-product event.
fn single_item(product: &Product, quantity: u32, currency: &str) -> Map<String, Value> {
    let line = [LineItem {
        product: product.clone(),
        quantity,
    }];
    let mut params = Map::new();
    params.insert("currency".to_string(), json!(currency));
    params.insert("value".to_string(), json!(items_value(&line)));
    params.insert("items".to_string(), ga4_items(&line));
    params
}

/// Inserts `value` when present.
pub(crate) fn insert_opt(params: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value);
    }
}
