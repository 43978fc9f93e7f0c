// crates/storefront-tracking/src/event.rs
// ============================================================================
// Module: Commerce Events
// Description: Sink-neutral conversion events and their product payloads.
// Purpose: Give every sink adapter one typed input to translate.
// Dependencies: serde, serde_json, storefront-core
// ============================================================================

//! ## Overview
//! [`CommerceEvent`] is what the orchestrator hands to each sink. Sinks map it
//! onto their own vocabulary (GA4 event names, Meta Pixel standard events, or
//! data-layer pushes).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use storefront_core::TransactionId;

// ============================================================================
// SECTION: Products
// ============================================================================

/// Product fields shared by every sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Unit price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Product {
    /// Creates a product with an id and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
            price: None,
        }
    }

    /// Sets the unit price.
    #[must_use]
    pub const fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Product with a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product purchased or carted.
    pub product: Product,
    /// Units.
    pub quantity: u32,
}

impl LineItem {
    /// Returns price times quantity, or zero when the price is unknown.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.product.price.unwrap_or(0.0) * f64::from(self.quantity)
    }
}

/// Sums line totals.
#[must_use]
pub fn items_value(items: &[LineItem]) -> f64 {
    items.iter().map(LineItem::total).sum()
}

// ============================================================================
// SECTION: Purchases
// ============================================================================

/// Purchase details as supplied by callers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PurchaseInput {
    /// Transaction id; synthesized when absent.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    /// Order total.
    pub value: f64,
    /// ISO currency code; the configured default when absent.
    #[serde(default)]
    pub currency: Option<String>,
    /// Purchased items.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Tax amount.
    #[serde(default)]
    pub tax: Option<f64>,
    /// Shipping amount.
    #[serde(default)]
    pub shipping: Option<f64>,
    /// Coupon code.
    #[serde(default)]
    pub coupon: Option<String>,
}

/// Normalized purchase forwarded to sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Purchase {
    /// Transaction id.
    pub transaction_id: TransactionId,
    /// Order total.
    pub value: f64,
    /// ISO currency code.
    pub currency: String,
    /// Purchased items.
    pub items: Vec<LineItem>,
    /// Tax amount.
    pub tax: Option<f64>,
    /// Shipping amount.
    pub shipping: Option<f64>,
    /// Coupon code.
    pub coupon: Option<String>,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Sink-neutral conversion event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommerceEvent {
    /// Page navigation.
    PageView {
        /// Page path.
        path: String,
        /// Page title.
        title: Option<String>,
    },
    /// Product detail view.
    ViewContent {
        /// Viewed product.
        product: Product,
        /// Currency of the product price.
        currency: String,
    },
    /// Item added to the cart.
    AddToCart {
        /// Carted item.
        item: LineItem,
        /// Currency of the product price.
        currency: String,
    },
    /// Checkout started.
    InitiateCheckout {
        /// Cart contents.
        items: Vec<LineItem>,
        /// Cart total.
        value: f64,
        /// Currency.
        currency: String,
    },
    /// Completed purchase.
    Purchase(Purchase),
    /// Item added to the wishlist.
    AddToWishlist {
        /// Wishlisted product.
        product: Product,
        /// Currency of the product price.
        currency: String,
    },
    /// Site search.
    Search {
        /// Search term.
        query: String,
    },
    /// Free-form event.
    Custom {
        /// Event name.
        name: String,
        /// Event parameters.
        params: Map<String, Value>,
    },
}

impl CommerceEvent {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PageView {
                ..
            } => "page_view",
            Self::ViewContent {
                ..
            } => "view_content",
            Self::AddToCart {
                ..
            } => "add_to_cart",
            Self::InitiateCheckout {
                ..
            } => "initiate_checkout",
            Self::Purchase(_) => "purchase",
            Self::AddToWishlist {
                ..
            } => "add_to_wishlist",
            Self::Search {
                ..
            } => "search",
            Self::Custom {
                ..
            } => "custom",
        }
    }
}
