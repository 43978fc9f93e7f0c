// crates/storefront-verify/src/controller.rs
// ============================================================================
// Module: Payment Verification Controller
// Description: State machine for the payment return flow.
// Purpose: Verify a payment at most once and issue one deterministic redirect.
// Dependencies: storefront-core, storefront-gateway, storefront-store, serde_json, url
// ============================================================================

//! ## Overview
//! The controller starts in [`VerificationState::Verifying`] and moves to one
//! of three terminal states:
//! - `Success`: the backend reported `success` with status `PAID`.
//! - `Failed`: the backend answered with any other status.
//! - `Error`: no order id, a transport failure, or a suppressed failure.
//!
//! Each terminal state maps to exactly one redirect, always replacing the
//! current history entry. The redirect is kept so the user can re-trigger it
//! manually if automatic navigation did not take.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde_json::Value;
use serde_json::json;
use storefront_core::AuditEvent;
use storefront_core::AuditSink;
use storefront_core::Clock;
use storefront_core::Navigator;
use storefront_core::NoopAuditSink;
use storefront_core::OrderId;
use storefront_core::OrderVerifier;
use storefront_core::Redirect;
use storefront_core::SystemClock;
use storefront_core::VerificationResult;
use storefront_core::View;
use storefront_gateway::Outcome;
use storefront_gateway::ThrottleGateway;
use storefront_store::RedundantOrderStore;
use url::Url;

use crate::params::CF_ORDER_ID_PARAM;
use crate::params::PAYMENT_SESSION_PARAM;
use crate::params::extract_order_id;
use crate::params::query_object;
use crate::params::query_param;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "verify";
/// Gateway task key for verify calls.
const VERIFY_TASK_KEY: &str = "verify_payment";
/// Default confirmation view path.
pub const DEFAULT_CONFIRMATION_PATH: &str = "/order-confirmation";
/// Default cart view path.
pub const DEFAULT_CART_PATH: &str = "/cart";
/// Error code for a return URL without an order id.
pub const MISSING_ORDER_ID: &str = "missing_order_id";
/// Error code for a payment the backend did not report as paid.
pub const PAYMENT_FAILED: &str = "payment_failed";
/// Error code for a verification that could not complete.
pub const VERIFICATION_FAILED: &str = "verification_failed";
/// User-facing message for missing order ids.
const MISSING_ORDER_MESSAGE: &str =
    "We could not find your order reference. Please check your cart and try again.";
/// User-facing message for verification errors.
const VERIFICATION_ERROR_MESSAGE: &str =
    "We could not verify your payment. If you were charged, please contact support.";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Path of the confirmation view.
    pub confirmation_path: String,
    /// Path of the cart view.
    pub cart_path: String,
    /// Recover the order id from the redundant store when the URL has none.
    pub recover_from_store: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            confirmation_path: DEFAULT_CONFIRMATION_PATH.to_string(),
            cart_path: DEFAULT_CART_PATH.to_string(),
            recover_from_store: false,
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Verification lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// Verification in progress (initial state).
    Verifying,
    /// Payment confirmed.
    Success,
    /// Payment not completed.
    Failed,
    /// Verification could not be performed.
    Error,
}

impl VerificationState {
    /// Returns true for `Success`, `Failed`, and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Verifying)
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verifying => "verifying",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

/// Mutable controller state.
#[derive(Debug)]
struct ControllerState {
    /// Current lifecycle state.
    state: VerificationState,
    /// Whether `start` has run.
    started: bool,
    /// Order being verified.
    order_id: Option<OrderId>,
    /// Redirect issued on reaching a terminal state.
    redirect: Option<Redirect>,
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Payment return flow controller; one instance per page load.
pub struct PaymentVerificationController {
    /// Verify backend.
    verifier: Arc<dyn OrderVerifier>,
    /// Outbound gateway.
    gateway: ThrottleGateway,
    /// Navigation layer.
    navigator: Arc<dyn Navigator>,
    /// Optional order store for id recovery.
    store: Option<RedundantOrderStore>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Wall clock for redirect timestamps.
    clock: Arc<dyn Clock>,
    /// Controller settings.
    config: VerifyConfig,
    /// Lifecycle state.
    inner: Mutex<ControllerState>,
}

impl PaymentVerificationController {
    /// Creates a controller using the shared gateway and system clock.
    #[must_use]
    pub fn new(verifier: Arc<dyn OrderVerifier>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            verifier,
            gateway: ThrottleGateway::shared(),
            navigator,
            store: None,
            audit: Arc::new(NoopAuditSink),
            clock: Arc::new(SystemClock),
            config: VerifyConfig::default(),
            inner: Mutex::new(ControllerState {
                state: VerificationState::Verifying,
                started: false,
                order_id: None,
                redirect: None,
            }),
        }
    }

    /// Routes verify calls through `gateway`.
    #[must_use]
    pub fn with_gateway(mut self, gateway: ThrottleGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// Attaches the order store used for id recovery.
    #[must_use]
    pub fn with_store(mut self, store: RedundantOrderStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the clock used for redirect timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets controller settings.
    #[must_use]
    pub fn with_config(mut self, config: VerifyConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> VerificationState {
        self.lock().state
    }

    /// Returns the order being verified.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.lock().order_id.clone()
    }

    /// Returns the redirect issued on reaching a terminal state.
    #[must_use]
    pub fn redirect(&self) -> Option<Redirect> {
        self.lock().redirect.clone()
    }

    /// Runs the verification flow for the return URL.
    ///
    /// Only the first call performs work; later calls return the current state.
    pub async fn start(&self, url: &Url) -> VerificationState {
        {
            let mut inner = self.lock();
            if inner.started {
                return inner.state;
            }
            inner.started = true;
        }

        let Some(order_id) = self.resolve_order_id(url) else {
            let redirect = self.missing_order_redirect(url);
            return self.finish(VerificationState::Error, redirect, "order id missing".to_string());
        };
        self.lock().order_id = Some(order_id.clone());
        self.audit.record(
            &AuditEvent::at(self.clock.as_ref(), COMPONENT, "verification_started", "ok")
                .subject(order_id.as_str()),
        );

        let verifier = Arc::clone(&self.verifier);
        let outcome = self.gateway.fetch(VERIFY_TASK_KEY, || verifier.verify(&order_id)).await;
        match outcome {
            Ok(Outcome::Completed(result)) if result.is_paid() => {
                let redirect = self.success_redirect(url, &order_id, &result);
                self.finish(VerificationState::Success, redirect, result.status)
            }
            Ok(Outcome::Completed(result)) => {
                let redirect = self.failed_redirect(url, &order_id, &result);
                let detail = format!("status {}", result.status);
                self.finish(VerificationState::Failed, redirect, detail)
            }
            Ok(Outcome::Suppressed(message)) => self.finish_error(&order_id, message),
            // `fetch` never debounces; a superseded outcome reads as not completed.
            Ok(Outcome::Superseded) => {
                self.finish_error(&order_id, "verification not completed".to_string())
            }
            Err(err) => self.finish_error(&order_id, err.to_string()),
        }
    }

    /// Re-issues the terminal redirect. Returns false before a terminal state.
    pub fn continue_manually(&self) -> bool {
        let redirect = {
            let inner = self.lock();
            if !inner.state.is_terminal() {
                return false;
            }
            inner.redirect.clone()
        };
        let Some(redirect) = redirect else {
            return false;
        };
        self.navigator.navigate(&redirect);
        self.audit.record(
            &AuditEvent::at(self.clock.as_ref(), COMPONENT, "redirect_reissued", "ok")
                .detail(redirect.location()),
        );
        true
    }

    /// Picks the order id from the URL, then optionally from the store.
    fn resolve_order_id(&self, url: &Url) -> Option<OrderId> {
        if let Some(order_id) = extract_order_id(url) {
            return Some(order_id);
        }
        if !self.config.recover_from_store {
            return None;
        }
        let recovered = self.store.as_ref()?.get_id()?;
        self.audit.record(
            &AuditEvent::at(self.clock.as_ref(), COMPONENT, "order_id_recovered", "ok")
                .subject(recovered.as_str()),
        );
        Some(recovered)
    }

    /// Ends in [`VerificationState::Error`] with the cart error redirect.
    fn finish_error(&self, order_id: &OrderId, message: String) -> VerificationState {
        let redirect = self.error_redirect(order_id, &message);
        self.finish(VerificationState::Error, redirect, message)
    }

    /// Records the terminal state and navigates.
    fn finish(
        &self,
        state: VerificationState,
        redirect: Redirect,
        detail: String,
    ) -> VerificationState {
        let subject = {
            let mut inner = self.lock();
            inner.state = state;
            inner.redirect = Some(redirect.clone());
            inner.order_id.as_ref().map(|id| id.as_str().to_string())
        };
        let outcome = if state == VerificationState::Success { "ok" } else { "error" };
        let mut event = AuditEvent::at(self.clock.as_ref(), COMPONENT, state_event(state), outcome)
            .detail(detail);
        if let Some(subject) = subject {
            event = event.subject(subject);
        }
        self.audit.record(&event);
        self.navigator.navigate(&redirect);
        state
    }

    /// Builds the redirect for a URL without an order id.
    fn missing_order_redirect(&self, url: &Url) -> Redirect {
        Redirect {
            view: View::Cart,
            path: self.config.cart_path.clone(),
            query: vec![pair("error", MISSING_ORDER_ID)],
            state: json!({
                "error": MISSING_ORDER_MESSAGE,
                "params": query_object(url),
                "url": url.as_str(),
                "timestamp": self.clock.now().to_rfc3339(),
            }),
            replace: true,
        }
    }

    /// Builds the confirmation redirect.
    fn success_redirect(
        &self,
        url: &Url,
        order_id: &OrderId,
        result: &VerificationResult,
    ) -> Redirect {
        let mut query = vec![
            pair("order_id", order_id.as_str()),
            pair("verified", "true"),
            pair("timestamp", &self.clock.now().to_rfc3339()),
        ];
        push_url_param(&mut query, url, CF_ORDER_ID_PARAM);
        push_url_param(&mut query, url, PAYMENT_SESSION_PARAM);
        if let Some(amount) = result.amount() {
            query.push(pair("amount", &amount));
        }
        if let Some(currency) = result.currency() {
            query.push(pair("currency", &currency));
        }
        Redirect {
            view: View::Confirmation,
            path: self.config.confirmation_path.clone(),
            query,
            state: json!({
                "order": result.order_value(),
                "verified": true,
            }),
            replace: true,
        }
    }

    /// Builds the redirect for an unpaid order.
    fn failed_redirect(
        &self,
        url: &Url,
        order_id: &OrderId,
        result: &VerificationResult,
    ) -> Redirect {
        let status = if result.status.is_empty() { "UNKNOWN" } else { result.status.as_str() };
        let mut query = vec![
            pair("error", PAYMENT_FAILED),
            pair("order_id", order_id.as_str()),
            pair("status", status),
        ];
        push_url_param(&mut query, url, CF_ORDER_ID_PARAM);
        Redirect {
            view: View::Cart,
            path: self.config.cart_path.clone(),
            query,
            state: json!({
                "error": format!("Payment was not completed (status: {status})."),
                "order": result.order_value(),
            }),
            replace: true,
        }
    }

    /// Builds the redirect for a verification that could not complete.
    fn error_redirect(&self, order_id: &OrderId, message: &str) -> Redirect {
        Redirect {
            view: View::Cart,
            path: self.config.cart_path.clone(),
            query: vec![pair("error", VERIFICATION_FAILED), pair("order_id", order_id.as_str())],
            state: json!({
                "error": VERIFICATION_ERROR_MESSAGE,
                "debug": Value::String(message.to_string()),
            }),
            replace: true,
        }
    }

    /// Locks controller state, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an owned query pair.
fn pair(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

/// Copies a query parameter from the inbound URL when present.
fn push_url_param(query: &mut Vec<(String, String)>, url: &Url, name: &str) {
    if let Some(value) = query_param(url, name) {
        query.push((name.to_string(), value));
    }
}

/// Audit event name for a terminal state.
const fn state_event(state: VerificationState) -> &'static str {
    match state {
        VerificationState::Verifying => "verification_started",
        VerificationState::Success => "verification_succeeded",
        VerificationState::Failed => "verification_failed",
        VerificationState::Error => "verification_error",
    }
}
