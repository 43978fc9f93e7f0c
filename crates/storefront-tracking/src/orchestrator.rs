// crates/storefront-tracking/src/orchestrator.rs
// ============================================================================
// Module: Conversion Tracking Orchestrator
// Description: Dedup, readiness, and fan-out of commerce events to sinks.
// Purpose: Report each conversion once to every ready sink without blocking on failures.
// Dependencies: storefront-core, storefront-gateway, rand, tokio
// ============================================================================

//! ## Overview
//! The orchestrator owns the dedup state and the sink list:
//! - Page views are dropped when the same path was reported within the page
//!   view window, and otherwise debounced through the gateway per path.
//! - Product views and cart actions dedup through [`RecentEvents`].
//! - Purchases dedup through the durable [`PurchaseCache`] in session storage.
//!   The read, prune, check, and record steps run under one lock before any
//!   sink is called.
//!
//! Before each dispatch every sink gets a readiness auto-fix. Sink failures are
//! audited per sink and never propagate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Map;
use serde_json::Value;
use storefront_core::AuditEvent;
use storefront_core::AuditSink;
use storefront_core::Clock;
use storefront_core::KeyValueStore;
use storefront_core::NoopAuditSink;
use storefront_core::OutboundError;
use storefront_core::SystemClock;
use storefront_core::Timestamp;
use storefront_core::TransactionId;
use storefront_gateway::Outcome;
use storefront_gateway::ThrottleGateway;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

use crate::dedup::PurchaseCache;
use crate::dedup::PurchaseRecord;
use crate::dedup::RecentEvents;
use crate::event::CommerceEvent;
use crate::event::LineItem;
use crate::event::Product;
use crate::event::Purchase;
use crate::event::PurchaseInput;
use crate::sink::AnalyticsSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "tracking";
/// Session storage key of the purchase idempotency cache.
pub const PURCHASE_CACHE_KEY: &str = "purchase_tracking_cache";
/// Category attached to custom events without one.
pub const DEFAULT_EVENT_CATEGORY: &str = "engagement";
/// Currency used when callers omit one.
pub const DEFAULT_CURRENCY: &str = "INR";
/// Length of the random suffix of synthesized transaction ids.
const TRANSACTION_SUFFIX_LEN: usize = 9;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Orchestrator windows and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Same-path page views inside this window are dropped.
    pub page_view_dedup: Duration,
    /// Debounce window for page views per path.
    pub page_view_batch: Duration,
    /// Product view dedup window.
    pub view_content_dedup: Duration,
    /// Cart action dedup window.
    pub cart_dedup: Duration,
    /// A transaction is forwarded at most once inside this window.
    pub purchase_window: Duration,
    /// Purchase records older than this are pruned.
    pub purchase_retention: Duration,
    /// Upper bound on `initialize`.
    pub init_timeout: Duration,
    /// Per-sink readiness wait.
    pub sink_ready_timeout: Duration,
    /// Category attached to custom events without one.
    pub default_category: String,
    /// Currency used when callers omit one.
    pub default_currency: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            page_view_dedup: Duration::from_secs(2),
            page_view_batch: Duration::from_millis(200),
            view_content_dedup: Duration::from_secs(3),
            cart_dedup: Duration::from_secs(2),
            purchase_window: Duration::from_secs(30),
            purchase_retention: Duration::from_secs(5 * 60),
            init_timeout: Duration::from_secs(15),
            sink_ready_timeout: Duration::from_secs(8),
            default_category: DEFAULT_EVENT_CATEGORY.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Per-sink delivery counts for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Sinks that accepted the event.
    pub delivered: usize,
    /// Sinks that failed.
    pub failed: usize,
}

/// Result of one track call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The event reached the sinks.
    Dispatched(DispatchReport),
    /// The event was dropped as a duplicate.
    Duplicate,
    /// A later page view for the same path replaced this one.
    Superseded,
    /// The gateway was reset while the event waited.
    Aborted(String),
}

impl TrackOutcome {
    /// Returns true when the event reached the sinks.
    #[must_use]
    pub const fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched(_))
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Conversion tracking orchestrator.
pub struct TrackingOrchestrator {
    /// Registered sinks.
    sinks: Vec<Arc<dyn AnalyticsSink>>,
    /// Outbound gateway used for page view debounce.
    gateway: ThrottleGateway,
    /// Session storage holding the purchase cache.
    session: Arc<dyn KeyValueStore>,
    /// Wall clock for dedup windows.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Windows and timeouts.
    config: TrackingConfig,
    /// Shared initialization.
    init: OnceCell<()>,
    /// Set once initialization finished or timed out.
    initialized: AtomicBool,
    /// Last page view claimed for dispatch.
    last_page_view: Mutex<Option<(String, Timestamp)>>,
    /// Recent product and cart events.
    recent: Mutex<RecentEvents>,
    /// Serializes purchase check-then-record.
    purchase_lock: Mutex<()>,
}

impl TrackingOrchestrator {
    /// Creates an orchestrator with the shared gateway and system clock.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn AnalyticsSink>>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            sinks,
            gateway: ThrottleGateway::shared(),
            session,
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditSink),
            config: TrackingConfig::default(),
            init: OnceCell::new(),
            initialized: AtomicBool::new(false),
            last_page_view: Mutex::new(None),
            recent: Mutex::new(RecentEvents::default()),
            purchase_lock: Mutex::new(()),
        }
    }

    /// Routes page views through `gateway`.
    #[must_use]
    pub fn with_gateway(mut self, gateway: ThrottleGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// Sets the clock used for dedup windows.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets windows and timeouts.
    #[must_use]
    pub fn with_config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackingConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Readiness
    // ------------------------------------------------------------------------

    /// Initializes every sink in parallel, at most once.
    ///
    /// Concurrent callers share one in-flight initialization. Completion or
    /// timeout both mark the orchestrator initialized.
    pub async fn initialize(&self) {
        self.init
            .get_or_init(|| async {
                let bounded =
                    tokio::time::timeout(self.config.init_timeout, self.initialize_sinks()).await;
                if bounded.is_err() {
                    self.record("tracking_init_timeout", "error", None, None);
                }
                self.initialized.store(true, Ordering::SeqCst);
            })
            .await;
    }

    /// Initializes if needed and returns readiness.
    pub async fn ensure_ready(&self) -> bool {
        self.initialize().await;
        self.is_ready()
    }

    /// Returns true when initialized and at least one sink is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && self.sinks.iter().any(|sink| sink.is_ready())
    }

    /// Runs every sink's initialization concurrently.
    async fn initialize_sinks(&self) {
        let ready_timeout = self.config.sink_ready_timeout;
        let mut tasks = JoinSet::new();
        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            tasks.spawn(async move { (sink.name(), sink.initialize(ready_timeout).await) });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => self.record("sink_initialized", "ok", Some(name), None),
                Ok((name, Err(err))) => {
                    self.record("sink_init_failed", "error", Some(name), Some(err.to_string()));
                }
                Err(err) => {
                    self.record("sink_init_failed", "error", None, Some(err.to_string()));
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------------

    /// Reports a page view, dropping same-path repeats inside the dedup window.
    ///
    /// The path is claimed before the debounce so repeats arriving meanwhile
    /// are dropped; the claim is released when the view is never dispatched.
    pub async fn track_page_view(&self, path: &str, title: Option<&str>) -> TrackOutcome {
        let now = self.clock.now();
        let duplicate = {
            let mut last = lock(&self.last_page_view);
            let repeated = last.as_ref().is_some_and(|(last_path, seen)| {
                last_path == path && now.within(*seen, self.config.page_view_dedup)
            });
            if !repeated {
                *last = Some((path.to_string(), now));
            }
            repeated
        };
        if duplicate {
            self.record("event_deduplicated", "dropped", Some("page_view"), Some(path.into()));
            return TrackOutcome::Duplicate;
        }
        let event = CommerceEvent::PageView {
            path: path.to_string(),
            title: title.map(str::to_string),
        };
        let batch_key = format!("page_view:{path}");
        let outcome = self
            .gateway
            .batch(&batch_key, self.config.page_view_batch, || async {
                Ok::<_, OutboundError>(self.dispatch(&event))
            })
            .await;
        let outcome = match outcome {
            Ok(Outcome::Completed(report)) => return TrackOutcome::Dispatched(report),
            Ok(Outcome::Superseded) => TrackOutcome::Superseded,
            Ok(Outcome::Suppressed(message)) => TrackOutcome::Aborted(message),
            Err(err) => TrackOutcome::Aborted(err.to_string()),
        };
        self.release_page_view(path, now);
        outcome
    }

    /// Clears the last page view when it is still the claim made at `claimed`.
    fn release_page_view(&self, path: &str, claimed: Timestamp) {
        let mut last = lock(&self.last_page_view);
        if last.as_ref().is_some_and(|(last_path, seen)| last_path == path && *seen == claimed) {
            *last = None;
        }
    }

    /// Reports a product detail view.
    pub fn track_view_content(&self, product: &Product) -> TrackOutcome {
        let key = format!("view_content:{}", product.id);
        if !self.first_within(key, self.config.view_content_dedup) {
            return TrackOutcome::Duplicate;
        }
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::ViewContent {
            product: product.clone(),
            currency: self.config.default_currency.clone(),
        }))
    }

    /// Reports an add-to-cart action.
    pub fn track_add_to_cart(&self, product: &Product, quantity: u32) -> TrackOutcome {
        let key = format!("add_to_cart:{}:{quantity}", product.id);
        if !self.first_within(key, self.config.cart_dedup) {
            return TrackOutcome::Duplicate;
        }
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::AddToCart {
            item: LineItem {
                product: product.clone(),
                quantity,
            },
            currency: self.config.default_currency.clone(),
        }))
    }

    /// Reports checkout start.
    pub fn track_initiate_checkout(&self, items: &[LineItem], value: f64) -> TrackOutcome {
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::InitiateCheckout {
            items: items.to_vec(),
            value,
            currency: self.config.default_currency.clone(),
        }))
    }

    /// Reports a purchase at most once per transaction inside the purchase window.
    pub fn track_purchase(&self, input: PurchaseInput) -> TrackOutcome {
        let now = self.clock.now();
        let transaction_id =
            input.transaction_id.unwrap_or_else(|| synthesize_transaction_id(now));
        let purchase = Purchase {
            transaction_id,
            value: input.value,
            currency: input.currency.unwrap_or_else(|| self.config.default_currency.clone()),
            items: input.items,
            tax: input.tax,
            shipping: input.shipping,
            coupon: input.coupon,
        };
        if !self.claim_purchase(&purchase, now) {
            self.record(
                "purchase_deduplicated",
                "dropped",
                Some(purchase.transaction_id.as_str()),
                None,
            );
            return TrackOutcome::Duplicate;
        }
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::Purchase(purchase)))
    }

    /// Reports an add-to-wishlist action.
    pub fn track_add_to_wishlist(&self, product: &Product) -> TrackOutcome {
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::AddToWishlist {
            product: product.clone(),
            currency: self.config.default_currency.clone(),
        }))
    }

    /// Reports a site search.
    pub fn track_search(&self, query: &str) -> TrackOutcome {
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::Search {
            query: query.to_string(),
        }))
    }

    /// Reports a free-form event, attaching the default category when absent.
    pub fn track_custom_event(&self, name: &str, mut params: Map<String, Value>) -> TrackOutcome {
        params
            .entry("event_category")
            .or_insert_with(|| Value::String(self.config.default_category.clone()));
        TrackOutcome::Dispatched(self.dispatch(&CommerceEvent::Custom {
            name: name.to_string(),
            params,
        }))
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Returns true and records `key` when it was not seen inside `window`.
    fn first_within(&self, key: String, window: Duration) -> bool {
        let now = self.clock.now();
        let max_age = self.config.view_content_dedup.max(self.config.cart_dedup);
        let fresh = lock(&self.recent).check_and_record(key.clone(), now, window, max_age);
        if !fresh {
            self.record("event_deduplicated", "dropped", Some(key.as_str()), None);
        }
        fresh
    }

    /// Checks and records a purchase in the durable cache.
    ///
    /// Returns false when the transaction was reported inside the purchase
    /// window. Storage failures never block reporting.
    fn claim_purchase(&self, purchase: &Purchase, now: Timestamp) -> bool {
        let _guard = lock(&self.purchase_lock);
        let raw = match self.session.get(PURCHASE_CACHE_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                self.record(
                    "purchase_cache_read_failed",
                    "error",
                    Some(PURCHASE_CACHE_KEY),
                    Some(err.to_string()),
                );
                None
            }
        };
        let mut cache = PurchaseCache::parse(raw.as_deref());
        cache.prune(now, self.config.purchase_retention);
        let duplicate =
            cache.seen_within(&purchase.transaction_id, now, self.config.purchase_window);
        if !duplicate {
            cache.record(purchase.transaction_id.clone(), PurchaseRecord {
                value: purchase.value,
                currency: purchase.currency.clone(),
                timestamp: now,
                item_count: purchase.items.len(),
            });
        }
        let written = cache
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| {
                self.session.set(PURCHASE_CACHE_KEY, &json).map_err(|err| err.to_string())
            });
        if let Err(message) = written {
            self.record("purchase_cache_write_failed", "error", Some(PURCHASE_CACHE_KEY), Some(message));
        }
        !duplicate
    }

    /// Sends `event` to every sink, isolating failures.
    fn dispatch(&self, event: &CommerceEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        for sink in &self.sinks {
            if sink.auto_fix_ready() {
                self.record("sink_ready_autofixed", "ok", Some(sink.name()), None);
            }
            match sink.track(event) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    self.record(
                        "sink_dispatch_failed",
                        "error",
                        Some(sink.name()),
                        Some(format!("{}: {err}", event.kind())),
                    );
                }
            }
        }
        report
    }

    /// Records an audit event.
    fn record(
        &self,
        event: &'static str,
        outcome: &'static str,
        subject: Option<&str>,
        detail: Option<String>,
    ) {
        let mut entry = AuditEvent::at(self.clock.as_ref(), COMPONENT, event, outcome);
        if let Some(subject) = subject {
            entry = entry.subject(subject);
        }
        if let Some(detail) = detail {
            entry = entry.detail(detail);
        }
        self.audit.record(&entry);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks a mutex, recovering from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds `txn_<millis>_<random>`.
fn synthesize_transaction_id(now: Timestamp) -> TransactionId {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TRANSACTION_SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();
    TransactionId::new(format!("txn_{}_{suffix}", now.as_unix_millis()))
}
