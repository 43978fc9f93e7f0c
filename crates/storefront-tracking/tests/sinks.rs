// crates/storefront-tracking/tests/sinks.rs
// ============================================================================
// Module: Analytics Sink Tests
// Description: Vendor call translation and hook readiness.
// Purpose: Ensure each sink emits the calls its vendor expects.
// Dependencies: storefront-tracking, serde_json, tokio
// ============================================================================

//! ## Overview
//! Initializes each sink over a channel hook and inspects the calls it emits.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use storefront_core::TransactionId;
use storefront_tracking::AnalyticsSink;
use storefront_tracking::ChannelHook;
use storefront_tracking::CommerceEvent;
use storefront_tracking::GoogleAnalyticsSink;
use storefront_tracking::HookCall;
use storefront_tracking::LineItem;
use storefront_tracking::MetaPixelSink;
use storefront_tracking::Product;
use storefront_tracking::Purchase;
use storefront_tracking::SinkError;
use storefront_tracking::TagManagerSink;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Receiver;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Readiness wait used by every sink.
const READY: Duration = Duration::from_secs(1);

/// Returns a channel hook and its receiver.
fn channel() -> (Arc<ChannelHook>, Receiver<HookCall>) {
    let (sender, receiver) = mpsc::channel(32);
    (Arc::new(ChannelHook::new(sender)), receiver)
}

/// Drains every call received so far.
fn drain(receiver: &mut Receiver<HookCall>) -> Vec<HookCall> {
    let mut calls = Vec::new();
    while let Ok(call) = receiver.try_recv() {
        calls.push(call);
    }
    calls
}

/// Sample purchase with tax and a coupon.
fn sample_purchase() -> CommerceEvent {
    CommerceEvent::Purchase(Purchase {
        transaction_id: TransactionId::new("ORD-77"),
        value: 2598.0,
        currency: "INR".to_string(),
        items: vec![LineItem {
            product: Product::new("SKU-1", "Kurta").with_price(1299.0).with_category("apparel"),
            quantity: 2,
        }],
        tax: Some(120.0),
        shipping: None,
        coupon: Some("FESTIVE".to_string()),
    })
}

// ============================================================================
// SECTION: Google Analytics
// ============================================================================

#[tokio::test]
async fn ga4_configures_without_automatic_page_view() {
    let (hook, mut receiver) = channel();
    let sink = GoogleAnalyticsSink::new(hook, "G-TEST");
    sink.initialize(READY).await.unwrap();
    let calls = drain(&mut receiver);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "config");
    assert_eq!(calls[0].name, "G-TEST");
    assert_eq!(calls[0].payload, json!({"send_page_view": false}));
}

#[tokio::test]
async fn ga4_purchase_uses_ecommerce_schema() {
    let (hook, mut receiver) = channel();
    let sink = GoogleAnalyticsSink::new(hook, "G-TEST");
    sink.initialize(READY).await.unwrap();
    drain(&mut receiver);

    sink.track(&sample_purchase()).unwrap();
    let calls = drain(&mut receiver);
    assert_eq!(calls[0].command, "event");
    assert_eq!(calls[0].name, "purchase");
    let payload = &calls[0].payload;
    assert_eq!(payload["transaction_id"], json!("ORD-77"));
    assert_eq!(payload["tax"], json!(120.0));
    assert_eq!(payload["coupon"], json!("FESTIVE"));
    assert!(payload.get("shipping").is_none());
    assert_eq!(payload["items"][0]["item_category"], json!("apparel"));
    assert_eq!(payload["items"][0]["quantity"], json!(2));
}

#[tokio::test]
async fn sink_rejects_events_before_initialize() {
    let (hook, _receiver) = channel();
    let sink = GoogleAnalyticsSink::new(hook, "G-TEST");
    let err = sink.track(&CommerceEvent::Search {
        query: "silk".to_string(),
    });
    assert!(matches!(err, Err(SinkError::NotReady(_))));
}

// ============================================================================
// SECTION: Meta Pixel
// ============================================================================

#[tokio::test]
async fn meta_purchase_carries_event_id() {
    let (hook, mut receiver) = channel();
    let sink = MetaPixelSink::new(hook, "PIXEL-1");
    sink.initialize(READY).await.unwrap();
    let setup = drain(&mut receiver);
    assert_eq!(setup[0].command, "init");

    sink.track(&sample_purchase()).unwrap();
    let calls = drain(&mut receiver);
    assert_eq!(calls[0].command, "track");
    assert_eq!(calls[0].name, "Purchase");
    assert_eq!(calls[0].options, json!({"eventID": "ORD-77"}));
    assert_eq!(calls[0].payload["num_items"], json!(2));
}

#[tokio::test]
async fn meta_custom_events_use_track_custom() {
    let (hook, mut receiver) = channel();
    let sink = MetaPixelSink::new(hook, "PIXEL-1");
    sink.initialize(READY).await.unwrap();
    drain(&mut receiver);

    let mut params = Map::new();
    params.insert("event_category".to_string(), Value::String("engagement".to_string()));
    sink.track(&CommerceEvent::Custom {
        name: "size_guide_open".to_string(),
        params,
    })
    .unwrap();
    let calls = drain(&mut receiver);
    assert_eq!(calls[0].command, "trackCustom");
    assert_eq!(calls[0].name, "size_guide_open");
    assert_eq!(calls[0].options, Value::Null);
}

// ============================================================================
// SECTION: Tag Manager
// ============================================================================

#[tokio::test]
async fn tag_manager_clears_ecommerce_before_commerce_events() {
    let (hook, mut receiver) = channel();
    let sink = TagManagerSink::new(hook, "GTM-TEST");
    sink.initialize(READY).await.unwrap();
    let setup = drain(&mut receiver);
    assert_eq!(setup[0].payload["event"], json!("gtm.js"));

    sink.track(&sample_purchase()).unwrap();
    let calls = drain(&mut receiver);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].payload, json!({"ecommerce": null}));
    assert_eq!(calls[1].payload["event"], json!("purchase"));
    assert_eq!(calls[1].payload["ecommerce"]["transaction_id"], json!("ORD-77"));
}

#[tokio::test]
async fn tag_manager_flattens_non_commerce_events() {
    let (hook, mut receiver) = channel();
    let sink = TagManagerSink::new(hook, "GTM-TEST");
    sink.initialize(READY).await.unwrap();
    drain(&mut receiver);

    sink.track(&CommerceEvent::PageView {
        path: "/checkout".to_string(),
        title: None,
    })
    .unwrap();
    let calls = drain(&mut receiver);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payload, json!({"event": "page_view", "page_path": "/checkout"}));
}

// ============================================================================
// SECTION: Hooks
// ============================================================================

#[tokio::test]
async fn closed_channel_fails_initialize() {
    let (hook, receiver) = channel();
    drop(receiver);
    let sink = MetaPixelSink::new(hook, "PIXEL-1");
    let err = sink.initialize(READY).await.unwrap_err();
    assert!(matches!(err, SinkError::LoadFailed(_)));
    assert!(!sink.is_ready());
    assert!(!sink.auto_fix_ready());
}
