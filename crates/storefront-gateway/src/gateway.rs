// crates/storefront-gateway/src/gateway.rs
// ============================================================================
// Module: Storefront Throttle Gateway
// Description: FIFO admission with minimum spacing, concurrency ceiling, and debounce.
// Purpose: Bound outbound call rate system-wide and absorb non-actionable failures.
// Dependencies: storefront-core, tokio
// ============================================================================

//! ## Overview
//! Callers hand the gateway a task factory. The task runs immediately when the
//! queue is empty, fewer than `max_concurrent` tasks are in flight, and at least
//! `min_interval` has passed since the last execution started. Otherwise the
//! caller joins a FIFO queue and re-checks after `min_interval`, or earlier when
//! a completing task schedules a drain.
//!
//! Failures whose message matches the suppression list resolve as
//! [`Outcome::Suppressed`] instead of propagating.
//!
//! Invariants:
//! - Spacing is measured between executions, not arrivals.
//! - Locks are never held across an await point.
//! - A dropped queued caller leaves the queue, so later callers still progress.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::time::Duration;

use storefront_core::AuditEvent;
use storefront_core::AuditSink;
use storefront_core::NoopAuditSink;
use storefront_core::OutboundError;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio::time::sleep;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "gateway";
/// Default minimum spacing between executions.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(250);
/// Default ceiling on concurrently executing tasks.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;
/// Default delay between a completion and the next drain attempt.
pub const DEFAULT_DRAIN_DELAY: Duration = Duration::from_millis(50);
/// Default deadline applied by [`ThrottleGateway::fetch`].
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Error substrings treated as non-actionable by callers.
pub const DEFAULT_SUPPRESSED_ERRORS: &[&str] = &[
    "network error",
    "failed to fetch",
    "err_blocked_by_client",
    "err_name_not_resolved",
    "dns error",
    "connection refused",
    "connection reset",
    "aborted",
    "timed out",
    "google-analytics.com",
    "googletagmanager.com",
    "connect.facebook.net",
];

/// Shared process-wide gateway.
static SHARED: OnceLock<ThrottleGateway> = OnceLock::new();

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Throttle gateway limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum spacing between execution starts.
    pub min_interval: Duration,
    /// Maximum concurrently executing tasks.
    pub max_concurrent: usize,
    /// Delay between a completion and the next drain attempt.
    pub drain_delay: Duration,
    /// Deadline applied by [`ThrottleGateway::fetch`].
    pub fetch_timeout: Duration,
    /// Lowercase substrings of error messages that are suppressed.
    pub suppressed_errors: Vec<String>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            drain_delay: DEFAULT_DRAIN_DELAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            suppressed_errors: DEFAULT_SUPPRESSED_ERRORS
                .iter()
                .map(|pattern| (*pattern).to_string())
                .collect(),
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Settled result of a gateway call that did not propagate an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The task ran and produced a value.
    Completed(T),
    /// The task failed with a suppressed error; the message is kept for diagnostics.
    Suppressed(String),
    /// A later batch submission with the same key replaced this one.
    Superseded,
}

impl<T> Outcome<T> {
    /// Returns the completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Suppressed(_) | Self::Superseded => None,
        }
    }

    /// Returns true when the task ran to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Point-in-time gateway counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStats {
    /// Tasks currently executing.
    pub in_flight: usize,
    /// Callers waiting for admission.
    pub queued: usize,
    /// Batch keys with a pending debounce timer.
    pub pending_batches: usize,
}

// ============================================================================
// SECTION: Gateway State
// ============================================================================

/// Queued admission ticket.
#[derive(Debug)]
struct QueuedTask {
    /// Monotonic ticket number.
    ticket: u64,
    /// Caller-supplied task key.
    key: String,
    /// Arrival time.
    enqueued_at: Instant,
}

/// Admission decision for the queue head.
enum Slot {
    /// The head may execute now.
    Ready,
    /// The head must wait for the spacing interval to elapse.
    Wait(Duration),
    /// The concurrency ceiling is reached.
    Saturated,
}

/// Mutable gateway state.
#[derive(Debug, Default)]
struct GatewayState {
    /// Tasks currently executing.
    in_flight: usize,
    /// Start time of the most recent execution.
    last_execution: Option<Instant>,
    /// FIFO admission queue.
    queue: VecDeque<QueuedTask>,
    /// Next ticket number.
    next_ticket: u64,
    /// Latest generation per batch key.
    batches: HashMap<String, u64>,
    /// Next batch generation.
    next_batch: u64,
    /// Incremented by reset; stale callers compare against it.
    epoch: u64,
}

impl GatewayState {
    /// Classifies whether a task may start at `now`.
    fn slot(&self, now: Instant, config: &ThrottleConfig) -> Slot {
        if self.in_flight >= config.max_concurrent {
            return Slot::Saturated;
        }
        match self.last_execution {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < config.min_interval {
                    Slot::Wait(config.min_interval - elapsed)
                } else {
                    Slot::Ready
                }
            }
            None => Slot::Ready,
        }
    }

    /// Marks a task as started.
    fn begin(&mut self, now: Instant) {
        self.in_flight += 1;
        self.last_execution = Some(now);
    }

    /// Returns true when `ticket` heads the queue.
    fn is_head(&self, ticket: u64) -> bool {
        self.queue.front().is_some_and(|task| task.ticket == ticket)
    }
}

/// Shared gateway internals.
struct GatewayInner {
    /// Gateway limits.
    config: ThrottleConfig,
    /// Mutable state.
    state: Mutex<GatewayState>,
    /// Wakes queued callers for a re-check.
    wake: Notify,
    /// Audit sink for suppression and queue events.
    audit: Arc<dyn AuditSink>,
}

impl GatewayInner {
    /// Locks the state, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an audit event for this component.
    fn audit(&self, event: &'static str, outcome: &'static str, subject: &str, detail: String) {
        self.audit.record(
            &AuditEvent::new(COMPONENT, event, outcome).subject(subject).detail(detail),
        );
    }
}

/// Releases an in-flight slot when the task settles or is dropped.
struct InFlightGuard {
    /// Gateway internals.
    inner: Arc<GatewayInner>,
    /// Epoch the slot was taken in.
    epoch: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            if state.epoch == self.epoch {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
        }
        schedule_drain(&self.inner);
    }
}

/// Removes a queued ticket when its caller stops waiting.
struct QueuedTicket<'a> {
    /// Gateway internals.
    inner: &'a GatewayInner,
    /// Ticket to remove.
    ticket: u64,
}

impl Drop for QueuedTicket<'_> {
    fn drop(&mut self) {
        let removed = {
            let mut state = self.inner.lock();
            let before = state.queue.len();
            state.queue.retain(|task| task.ticket != self.ticket);
            before != state.queue.len()
        };
        if removed {
            self.inner.wake.notify_waiters();
        }
    }
}

/// Wakes queued callers after the drain delay.
fn schedule_drain(inner: &Arc<GatewayInner>) {
    let delay = inner.config.drain_delay;
    if let Ok(handle) = Handle::try_current() {
        let inner = Arc::clone(inner);
        handle.spawn(async move {
            sleep(delay).await;
            inner.wake.notify_waiters();
        });
    } else {
        inner.wake.notify_waiters();
    }
}

// ============================================================================
// SECTION: Throttle Gateway
// ============================================================================

/// Rate- and concurrency-limited gateway for outbound calls.
#[derive(Clone)]
pub struct ThrottleGateway {
    /// Shared internals.
    inner: Arc<GatewayInner>,
}

impl ThrottleGateway {
    /// Creates a gateway that discards audit events.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self::with_audit(config, Arc::new(NoopAuditSink))
    }

    /// Creates a gateway reporting to the provided audit sink.
    #[must_use]
    pub fn with_audit(config: ThrottleConfig, audit: Arc<dyn AuditSink>) -> Self {
        let suppressed_errors =
            config.suppressed_errors.iter().map(|pattern| pattern.to_lowercase()).collect();
        Self {
            inner: Arc::new(GatewayInner {
                config: ThrottleConfig {
                    suppressed_errors,
                    ..config
                },
                state: Mutex::new(GatewayState::default()),
                wake: Notify::new(),
                audit,
            }),
        }
    }

    /// Returns the process-wide default gateway, creating it on first use.
    #[must_use]
    pub fn shared() -> Self {
        SHARED.get_or_init(|| Self::new(ThrottleConfig::default())).clone()
    }

    /// Returns the gateway limits.
    #[must_use]
    pub fn config(&self) -> &ThrottleConfig {
        &self.inner.config
    }

    /// Returns current counters.
    #[must_use]
    pub fn stats(&self) -> GatewayStats {
        let state = self.inner.lock();
        GatewayStats {
            in_flight: state.in_flight,
            queued: state.queue.len(),
            pending_batches: state.batches.len(),
        }
    }

    /// Runs `task` once admitted.
    ///
    /// # Errors
    ///
    /// Returns the task's error when it does not match the suppression list,
    /// or [`OutboundError::Aborted`] when the gateway is reset while queued.
    pub async fn submit<T, F, Fut>(&self, key: &str, task: F) -> Result<Outcome<T>, OutboundError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, OutboundError>>,
    {
        let guard = self.admit(key).await?;
        let result = task().await;
        drop(guard);
        self.settle(key, result)
    }

    /// Runs `task` under the fetch deadline.
    ///
    /// Expiry drops the underlying future and yields [`OutboundError::Timeout`],
    /// which then passes through the suppression policy.
    ///
    /// # Errors
    ///
    /// Same as [`ThrottleGateway::submit`].
    pub async fn fetch<T, F, Fut>(&self, key: &str, task: F) -> Result<Outcome<T>, OutboundError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, OutboundError>>,
    {
        let deadline = self.inner.config.fetch_timeout;
        self.submit(key, move || async move {
            match tokio::time::timeout(deadline, task()).await {
                Ok(result) => result,
                Err(_) => Err(OutboundError::Timeout {
                    after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
        .await
    }

    /// Debounces submissions sharing `batch_key`.
    ///
    /// Only the last call within `delay` runs; earlier calls resolve as
    /// [`Outcome::Superseded`].
    ///
    /// # Errors
    ///
    /// Same as [`ThrottleGateway::submit`].
    pub async fn batch<T, F, Fut>(
        &self,
        batch_key: &str,
        delay: Duration,
        task: F,
    ) -> Result<Outcome<T>, OutboundError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, OutboundError>>,
    {
        let (generation, epoch) = {
            let mut state = self.inner.lock();
            state.next_batch += 1;
            let generation = state.next_batch;
            state.batches.insert(batch_key.to_string(), generation);
            (generation, state.epoch)
        };
        sleep(delay).await;
        let is_latest = {
            let mut state = self.inner.lock();
            if state.epoch != epoch {
                return Err(OutboundError::Aborted("throttle gateway reset".to_string()));
            }
            let is_latest = state.batches.get(batch_key) == Some(&generation);
            if is_latest {
                state.batches.remove(batch_key);
            }
            is_latest
        };
        if !is_latest {
            return Ok(Outcome::Superseded);
        }
        self.submit(batch_key, task).await
    }

    /// Clears queue, counters, and batch timers. Queued callers settle with
    /// [`OutboundError::Aborted`].
    pub fn reset(&self) {
        let dropped = {
            let mut state = self.inner.lock();
            let dropped = state.queue.len();
            *state = GatewayState {
                epoch: state.epoch + 1,
                next_ticket: state.next_ticket,
                next_batch: state.next_batch,
                ..GatewayState::default()
            };
            dropped
        };
        self.inner.wake.notify_waiters();
        self.inner.audit("gateway_reset", "ok", COMPONENT, format!("dropped {dropped} queued"));
    }

    /// Waits until the caller may execute and takes an in-flight slot.
    async fn admit(&self, key: &str) -> Result<InFlightGuard, OutboundError> {
        let config = &self.inner.config;
        let (ticket, epoch) = {
            let mut state = self.inner.lock();
            let now = Instant::now();
            if state.queue.is_empty() && matches!(state.slot(now, config), Slot::Ready) {
                state.begin(now);
                return Ok(self.in_flight_guard(state.epoch));
            }
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.queue.push_back(QueuedTask {
                ticket,
                key: key.to_string(),
                enqueued_at: now,
            });
            (ticket, state.epoch)
        };
        let _pending = QueuedTicket {
            inner: &self.inner,
            ticket,
        };
        loop {
            let notified = self.inner.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let wait = {
                let mut state = self.inner.lock();
                if state.epoch != epoch {
                    return Err(OutboundError::Aborted("throttle gateway reset".to_string()));
                }
                let now = Instant::now();
                if state.is_head(ticket) {
                    match state.slot(now, config) {
                        Slot::Ready => {
                            let admitted = state.queue.pop_front();
                            state.begin(now);
                            drop(state);
                            if let Some(task) = admitted {
                                self.inner.audit(
                                    "gateway_task_dequeued",
                                    "ok",
                                    &task.key,
                                    format!(
                                        "waited {}ms",
                                        now.saturating_duration_since(task.enqueued_at).as_millis()
                                    ),
                                );
                            }
                            self.inner.wake.notify_waiters();
                            return Ok(self.in_flight_guard(epoch));
                        }
                        Slot::Wait(remaining) => remaining,
                        Slot::Saturated => config.min_interval,
                    }
                } else {
                    config.min_interval
                }
            };
            tokio::select! {
                () = sleep(wait) => {}
                () = notified.as_mut() => {}
            }
        }
    }

    /// Builds the guard releasing an in-flight slot.
    fn in_flight_guard(&self, epoch: u64) -> InFlightGuard {
        InFlightGuard {
            inner: Arc::clone(&self.inner),
            epoch,
        }
    }

    /// Applies the suppression policy to a task result.
    fn settle<T>(
        &self,
        key: &str,
        result: Result<T, OutboundError>,
    ) -> Result<Outcome<T>, OutboundError> {
        match result {
            Ok(value) => Ok(Outcome::Completed(value)),
            Err(err) => {
                let message = err.to_string();
                let lowered = message.to_lowercase();
                let matched = self
                    .inner
                    .config
                    .suppressed_errors
                    .iter()
                    .any(|pattern| !pattern.is_empty() && lowered.contains(pattern.as_str()));
                if matched {
                    self.inner.audit("gateway_error_suppressed", "dropped", key, message.clone());
                    Ok(Outcome::Suppressed(message))
                } else {
                    Err(err)
                }
            }
        }
    }
}
