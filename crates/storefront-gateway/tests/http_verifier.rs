// crates/storefront-gateway/tests/http_verifier.rs
// ============================================================================
// Module: HTTP Order Verifier Tests
// Description: Request shape and response handling against a local stub server.
// Purpose: Validate path encoding, status handling, and body limits.
// Dependencies: storefront-gateway, storefront-core, tiny_http, tokio
// ============================================================================

//! ## Overview
//! Each test serves one canned response from a `tiny_http` server thread.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::mpsc;
use std::thread;
use std::thread::JoinHandle;

use storefront_core::OrderId;
use storefront_core::OrderVerifier;
use storefront_core::OutboundError;
use storefront_gateway::HttpOrderVerifier;
use storefront_gateway::HttpVerifierConfig;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use url::Url;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Captured request line details.
struct Captured {
    /// Request path and query.
    url: String,
    /// Authorization header, if sent.
    authorization: Option<String>,
}

/// Serves a single response and reports what the client sent.
fn serve_once(
    status: u16,
    body: &'static str,
) -> (Url, mpsc::Receiver<Captured>, JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let base = Url::parse(&format!("http://{}/api/", server.server_addr())).unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.to_string());
            let _ = tx.send(Captured {
                url: request.url().to_string(),
                authorization,
            });
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
            request.respond(response).expect("respond");
        }
    });
    (base, rx, handle)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn verify_requests_encoded_order_path_with_token() {
    let (base, rx, handle) =
        serve_once(200, r#"{"success":true,"status":"PAID","order":{"order_amount":"99.00"}}"#);
    let verifier =
        HttpOrderVerifier::new(HttpVerifierConfig::new(base).with_bearer_token("secret")).unwrap();

    let result = verifier.verify(&OrderId::new("ORD 1/2")).await.unwrap();

    assert!(result.is_paid());
    assert_eq!(result.amount().as_deref(), Some("99.00"));
    let captured = rx.recv().unwrap();
    assert_eq!(captured.url, "/api/verify/ORD%201%2F2");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer secret"));
    handle.join().unwrap();
}

#[tokio::test]
async fn non_success_status_with_json_body_is_returned() {
    let (base, _rx, handle) = serve_once(404, r#"{"success":false,"status":"NOT_FOUND"}"#);
    let verifier = HttpOrderVerifier::new(HttpVerifierConfig::new(base)).unwrap();

    let result = verifier.verify(&OrderId::new("missing")).await.unwrap();

    assert!(!result.success);
    assert!(!result.is_paid());
    handle.join().unwrap();
}

#[tokio::test]
async fn non_success_status_without_json_is_http_error() {
    let (base, _rx, handle) = serve_once(502, "bad gateway");
    let verifier = HttpOrderVerifier::new(HttpVerifierConfig::new(base)).unwrap();

    let err = verifier.verify(&OrderId::new("ORD-1")).await.unwrap_err();

    assert_eq!(
        err,
        OutboundError::Http {
            status: 502
        }
    );
    handle.join().unwrap();
}

#[tokio::test]
async fn malformed_success_body_is_invalid_response() {
    let (base, _rx, handle) = serve_once(200, "{not json");
    let verifier = HttpOrderVerifier::new(HttpVerifierConfig::new(base)).unwrap();

    let err = verifier.verify(&OrderId::new("ORD-1")).await.unwrap_err();

    assert!(matches!(err, OutboundError::InvalidResponse(_)));
    handle.join().unwrap();
}

#[test]
fn rejects_non_http_base_url() {
    let config = HttpVerifierConfig::new(Url::parse("ftp://example.com/").unwrap());
    assert!(matches!(HttpOrderVerifier::new(config), Err(OutboundError::InvalidRequest(_))));
}
