// crates/storefront-verify/tests/controller.rs
// ============================================================================
// Module: Payment Verification Controller Tests
// Description: State transitions and redirect construction for the return flow.
// Purpose: Ensure one verify call per controller and deterministic redirects.
// Dependencies: storefront-verify, storefront-gateway, storefront-store, storefront-core, tokio
// ============================================================================

//! ## Overview
//! Drives the controller with a stub verifier and a recording navigator.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::json;
use storefront_core::Clock;
use storefront_core::InMemoryAuditSink;
use storefront_core::InMemoryKeyValueStore;
use storefront_core::ManualClock;
use storefront_core::OrderId;
use storefront_core::OrderVerifier;
use storefront_core::OutboundError;
use storefront_core::RecordingNavigator;
use storefront_core::Redirect;
use storefront_core::StoredOrderRecord;
use storefront_core::Timestamp;
use storefront_core::VerificationResult;
use storefront_core::View;
use storefront_gateway::ThrottleConfig;
use storefront_gateway::ThrottleGateway;
use storefront_store::RedundantOrderStore;
use storefront_verify::PaymentVerificationController;
use storefront_verify::VerificationState;
use storefront_verify::VerifyConfig;
use url::Url;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Verifier returning a canned response and counting calls.
struct StubVerifier {
    /// Canned response.
    response: Result<VerificationResult, OutboundError>,
    /// Calls received.
    calls: AtomicUsize,
    /// Order ids received.
    seen: std::sync::Mutex<Vec<OrderId>>,
}

impl StubVerifier {
    /// Creates a stub with a canned response.
    fn new(response: Result<VerificationResult, OutboundError>) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Creates a stub answering with `success` and `status`.
    fn answering(status: &str) -> Arc<Self> {
        Self::new(Ok(serde_json::from_value(json!({
            "success": true,
            "status": status,
            "order": {"order_amount": 1499.5, "order_currency": "INR", "order_id": "ORD-1"}
        }))
        .unwrap()))
    }
}

#[async_trait]
impl OrderVerifier for StubVerifier {
    async fn verify(&self, order_id: &OrderId) -> Result<VerificationResult, OutboundError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(order_id.clone());
        self.response.clone()
    }
}

/// Controller plus its collaborators.
struct Harness {
    /// Controller under test.
    controller: PaymentVerificationController,
    /// Navigation capture.
    navigator: Arc<RecordingNavigator>,
    /// Audit capture.
    audit: Arc<InMemoryAuditSink>,
    /// Fixed clock.
    clock: Arc<ManualClock>,
}

/// Builds a controller with an isolated gateway and fixed clock.
fn harness(verifier: Arc<StubVerifier>) -> Harness {
    let navigator = Arc::new(RecordingNavigator::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1_700_000_000_000)));
    let controller = PaymentVerificationController::new(verifier, navigator.clone())
        .with_gateway(ThrottleGateway::new(ThrottleConfig::default()))
        .with_audit(audit.clone())
        .with_clock(clock.clone());
    Harness {
        controller,
        navigator,
        audit,
        clock,
    }
}

/// Parses a return URL.
fn url(query: &str) -> Url {
    Url::parse(&format!("https://shop.example/payment/return?{query}")).unwrap()
}

/// Returns the query as borrowed pairs.
fn query(redirect: &Redirect) -> Vec<(&str, &str)> {
    redirect.query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

// ============================================================================
// SECTION: Missing Order Id
// ============================================================================

#[tokio::test(start_paused = true)]
async fn missing_order_id_redirects_to_cart_without_network_call() {
    let verifier = StubVerifier::answering("PAID");
    let h = harness(verifier.clone());
    let return_url = url("cf_order_id=cf_1&order_id=");

    let state = h.controller.start(&return_url).await;

    assert_eq!(state, VerificationState::Error);
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    let redirect = h.navigator.last().unwrap();
    assert_eq!(redirect.view, View::Cart);
    assert_eq!(redirect.location(), "/cart?error=missing_order_id");
    assert!(redirect.replace);
    assert_eq!(redirect.state["params"]["cf_order_id"], "cf_1");
    assert_eq!(redirect.state["url"], return_url.as_str());
    assert_eq!(redirect.state["timestamp"], h.clock.now().to_rfc3339());
}

#[tokio::test(start_paused = true)]
async fn store_recovery_is_opt_in() {
    let persistent = InMemoryKeyValueStore::new();
    let store = RedundantOrderStore::new(
        Arc::new(persistent.clone()),
        Arc::new(InMemoryKeyValueStore::new()),
    );
    assert!(store.store(&StoredOrderRecord::new(OrderId::new("ORD-STORED"), Timestamp::default())));

    let disabled = harness(StubVerifier::answering("PAID")).controller.with_store(store.clone());
    assert_eq!(disabled.start(&url("")).await, VerificationState::Error);

    let verifier = StubVerifier::answering("PAID");
    let enabled = harness(verifier.clone());
    let controller = enabled.controller.with_store(store).with_config(VerifyConfig {
        recover_from_store: true,
        ..VerifyConfig::default()
    });
    assert_eq!(controller.start(&url("")).await, VerificationState::Success);
    assert_eq!(verifier.seen.lock().unwrap().clone(), vec![OrderId::new("ORD-STORED")]);
    assert_eq!(enabled.audit.count("order_id_recovered"), 1);
}

// ============================================================================
// SECTION: Verified Outcomes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn paid_order_redirects_to_confirmation() {
    let verifier = StubVerifier::answering("PAID");
    let h = harness(verifier.clone());

    let state = h
        .controller
        .start(&url("orderId=LOSER&order_id=ORD-1&cf_order_id=cf_1&payment_session_id=sess_9"))
        .await;

    assert_eq!(state, VerificationState::Success);
    assert_eq!(verifier.seen.lock().unwrap().clone(), vec![OrderId::new("ORD-1")]);
    let redirect = h.navigator.last().unwrap();
    assert_eq!(redirect.view, View::Confirmation);
    assert_eq!(redirect.path, "/order-confirmation");
    let timestamp = h.clock.now().to_rfc3339();
    assert_eq!(
        query(&redirect),
        vec![
            ("order_id", "ORD-1"),
            ("verified", "true"),
            ("timestamp", timestamp.as_str()),
            ("cf_order_id", "cf_1"),
            ("payment_session_id", "sess_9"),
            ("amount", "1499.5"),
            ("currency", "INR"),
        ]
    );
    assert_eq!(redirect.state["order"]["order_currency"], "INR");
    assert!(redirect.replace);
    assert_eq!(h.audit.count("verification_succeeded"), 1);
}

#[tokio::test(start_paused = true)]
async fn unpaid_status_redirects_to_cart_with_payment_failed() {
    let h = harness(StubVerifier::answering("FAILED"));

    let state = h.controller.start(&url("order_id=ORD-2&cf_order_id=cf_2")).await;

    assert_eq!(state, VerificationState::Failed);
    let redirect = h.navigator.last().unwrap();
    assert_eq!(
        redirect.location(),
        "/cart?error=payment_failed&order_id=ORD-2&status=FAILED&cf_order_id=cf_2"
    );
    assert!(redirect.state["error"].as_str().unwrap().contains("FAILED"));
    assert_eq!(redirect.state["order"]["order_id"], "ORD-1");
}

#[tokio::test(start_paused = true)]
async fn paid_status_without_success_flag_is_failed() {
    let h = harness(StubVerifier::new(Ok(VerificationResult {
        success: false,
        status: "PAID".to_string(),
        order: None,
    })));

    assert_eq!(h.controller.start(&url("order=ORD-3")).await, VerificationState::Failed);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_redirects_with_verification_failed() {
    let h = harness(StubVerifier::new(Err(OutboundError::Http {
        status: 500,
    })));

    let state = h.controller.start(&url("order_id=ORD-4")).await;

    assert_eq!(state, VerificationState::Error);
    let redirect = h.navigator.last().unwrap();
    assert_eq!(redirect.location(), "/cart?error=verification_failed&order_id=ORD-4");
    assert_eq!(redirect.state["debug"], "http status 500");
}

#[tokio::test(start_paused = true)]
async fn suppressed_failure_is_still_an_error() {
    let h = harness(StubVerifier::new(Err(OutboundError::Network(
        "connection refused".to_string(),
    ))));

    let state = h.controller.start(&url("order_id=ORD-5")).await;

    assert_eq!(state, VerificationState::Error);
    let redirect = h.navigator.last().unwrap();
    assert_eq!(redirect.location(), "/cart?error=verification_failed&order_id=ORD-5");
    assert!(redirect.state["debug"].as_str().unwrap().contains("connection refused"));
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn start_runs_at_most_once() {
    let verifier = StubVerifier::answering("PAID");
    let h = harness(verifier.clone());
    let return_url = url("order_id=ORD-6");

    assert_eq!(h.controller.start(&return_url).await, VerificationState::Success);
    assert_eq!(h.controller.start(&url("order_id=OTHER")).await, VerificationState::Success);

    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.navigator.redirects().len(), 1);
    assert_eq!(h.controller.order_id(), Some(OrderId::new("ORD-6")));
}

#[tokio::test(start_paused = true)]
async fn continue_manually_reissues_the_same_redirect() {
    let h = harness(StubVerifier::answering("FAILED"));
    assert!(!h.controller.continue_manually());

    h.controller.start(&url("order_id=ORD-7")).await;
    assert!(h.controller.continue_manually());

    let redirects = h.navigator.redirects();
    assert_eq!(redirects.len(), 2);
    assert_eq!(redirects[0], redirects[1]);
    assert_eq!(h.controller.redirect(), Some(redirects[0].clone()));
}

#[tokio::test(start_paused = true)]
async fn redirects_are_deterministic_for_identical_inputs() {
    for status in ["PAID", "FAILED"] {
        let first = harness(StubVerifier::answering(status));
        let second = harness(StubVerifier::answering(status));
        let return_url = url("order_id=ORD-8&cf_order_id=cf_8");

        first.controller.start(&return_url).await;
        second.controller.start(&return_url).await;

        assert_eq!(first.navigator.last(), second.navigator.last());
    }
}
