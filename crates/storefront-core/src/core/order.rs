// crates/storefront-core/src/core/order.rs
// ============================================================================
// Module: Storefront Order Records
// Description: Stored in-flight order records and remote verification results.
// Purpose: Model the order data that survives redirects and the verify response.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`StoredOrderRecord`] is the structured copy of a checkout attempt written to
//! client storage before the payment redirect. Records written by older call
//! sites may omit fields or encode the amount as a string, so deserialization is
//! lenient everywhere except `order_id`.
//! [`VerificationResult`] is the verify backend's answer for one order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::OrderId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Only verify status treated as a completed payment.
pub const PAID_STATUS: &str = "PAID";

// ============================================================================
// SECTION: Stored Order Record
// ============================================================================

/// In-flight order identity persisted across redirects.
///
/// # Invariants
/// - `order_id` is non-empty for every record returned by a store read.
/// - `source` is only set on records synthesized from single-value keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOrderRecord {
    /// Storefront order identifier.
    pub order_id: OrderId,
    /// Payment gateway order identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_order_id: Option<String>,
    /// Payment gateway session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_session_id: Option<String>,
    /// Order total; accepts a number or a numeric string.
    #[serde(
        default,
        deserialize_with = "deserialize_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_amount: Option<f64>,
    /// Customer details captured at checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<Value>,
    /// Creation time; zero for legacy records that omitted it.
    #[serde(default)]
    pub created_at: Timestamp,
    /// Payment environment label (for example `sandbox` or `production`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Fallback source marker for synthesized records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StoredOrderRecord {
    /// Creates a record carrying only the order id and creation time.
    #[must_use]
    pub const fn new(order_id: OrderId, created_at: Timestamp) -> Self {
        Self {
            order_id,
            cf_order_id: None,
            payment_session_id: None,
            order_amount: None,
            customer_details: None,
            created_at,
            environment: None,
            source: None,
        }
    }

    /// Creates the minimal record synthesized from a single-value key.
    #[must_use]
    pub fn minimal(order_id: OrderId, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(order_id, Timestamp::default())
        }
    }

    /// Parses a stored JSON string into a record.
    ///
    /// Returns `None` unless the value is a JSON object with a non-empty
    /// string `order_id`.
    #[must_use]
    pub fn from_json(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let order_id = value.get("order_id")?.as_str()?;
        if order_id.trim().is_empty() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Accepts amounts written as JSON numbers or numeric strings.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

// ============================================================================
// SECTION: Verification Result
// ============================================================================

/// Response of the remote verify collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the backend call itself succeeded.
    #[serde(default)]
    pub success: bool,
    /// Payment status reported by the gateway.
    #[serde(default)]
    pub status: String,
    /// Order object returned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Map<String, Value>>,
}

impl VerificationResult {
    /// Returns true when the payment is final and successful.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.success && self.status == PAID_STATUS
    }

    /// Returns the order amount as a display string when present.
    #[must_use]
    pub fn amount(&self) -> Option<String> {
        match self.order_field("order_amount")? {
            Value::Number(number) => Some(number.to_string()),
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }

    /// Returns the order currency when present.
    #[must_use]
    pub fn currency(&self) -> Option<String> {
        self.order_field("order_currency")
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
    }

    /// Returns the order object as a JSON value (`null` when absent).
    #[must_use]
    pub fn order_value(&self) -> Value {
        self.order.clone().map_or(Value::Null, Value::Object)
    }

    /// Looks up a field on the returned order object.
    fn order_field(&self, key: &str) -> Option<&Value> {
        self.order.as_ref()?.get(key)
    }
}
