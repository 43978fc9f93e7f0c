// crates/storefront-verify/src/params.rs
// ============================================================================
// Module: Return URL Parameters
// Description: Order id and gateway parameter extraction from return URLs.
// Purpose: Apply a fixed priority across accepted parameter names.
// Dependencies: storefront-core, url
// ============================================================================

//! ## Overview
//! The gateway and older storefront builds disagree on the order id parameter
//! name, so three names are accepted. The first non-empty value in
//! [`ORDER_ID_PARAMS`] order wins regardless of position in the query string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use storefront_core::OrderId;
use url::Url;

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// Accepted order id parameter names, highest priority first.
pub const ORDER_ID_PARAMS: [&str; 3] = ["order_id", "orderId", "order"];

/// Payment gateway order id parameter.
pub const CF_ORDER_ID_PARAM: &str = "cf_order_id";

/// Payment gateway session parameter.
pub const PAYMENT_SESSION_PARAM: &str = "payment_session_id";

/// Returns the order id carried by `url`, if any.
#[must_use]
pub fn extract_order_id(url: &Url) -> Option<OrderId> {
    ORDER_ID_PARAMS.iter().find_map(|name| query_param(url, name).and_then(|v| OrderId::parse(&v)))
}

/// Returns the first non-empty value of `name` in the query string.
#[must_use]
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Returns every query parameter as a JSON object; repeated keys keep the first value.
#[must_use]
pub fn query_object(url: &Url) -> Value {
    let mut params = Map::new();
    for (key, value) in url.query_pairs() {
        params.entry(key.into_owned()).or_insert_with(|| Value::String(value.into_owned()));
    }
    Value::Object(params)
}
