// crates/storefront-config/src/config.rs
// ============================================================================
// Module: Storefront Configuration
// Description: Configuration loading and validation for the checkout pipeline.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: storefront-gateway, storefront-tracking, storefront-verify, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys and out-of-range values fail the load. Every section converts
//! into the runtime config of the crate that owns it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use storefront_core::AuditSink;
use storefront_core::FileAuditSink;
use storefront_core::NoopAuditSink;
use storefront_core::StderrAuditSink;
use storefront_gateway::DEFAULT_SUPPRESSED_ERRORS;
use storefront_gateway::HttpVerifierConfig;
use storefront_gateway::ThrottleConfig;
use storefront_store_sqlite::SqliteStoreConfig;
use storefront_store_sqlite::SqliteStoreMode;
use storefront_store_sqlite::SqliteSyncMode;
use storefront_tracking::DEFAULT_CURRENCY;
use storefront_tracking::DEFAULT_EVENT_CATEGORY;
use storefront_tracking::TrackingConfig;
use storefront_verify::VerifyConfig;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "storefront.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "STOREFRONT_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of suppressed error patterns.
const MAX_SUPPRESSED_ERRORS: usize = 128;
/// Maximum length of a suppressed error pattern.
const MAX_PATTERN_LENGTH: usize = 256;
/// Maximum gateway concurrency.
const MAX_CONCURRENCY: usize = 64;
/// Upper bound for every millisecond window.
const MAX_WINDOW_MS: u64 = 60 * 60 * 1000;
/// Bounds for request timeouts in milliseconds.
const TIMEOUT_RANGE_MS: (u64, u64) = (100, 120_000);
/// Maximum length of a vendor id.
const MAX_SINK_ID_LENGTH: usize = 128;
/// Maximum length of a view path.
const MAX_VIEW_PATH_LENGTH: usize = 512;
/// Maximum `SQLite` busy timeout.
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Storefront configuration loaded from disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorefrontConfig {
    /// Outbound gateway configuration.
    #[serde(default)]
    pub gateway: GatewaySettings,
    /// Conversion tracking configuration.
    #[serde(default)]
    pub tracking: TrackingSettings,
    /// Payment verification configuration.
    #[serde(default)]
    pub verify: VerifySettings,
    /// Persistent storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditSettings,
}

impl StorefrontConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.tracking.validate()?;
        self.verify.validate()?;
        self.storage.validate()?;
        self.audit.validate()
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// `[gateway]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    /// Minimum spacing between execution starts.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Maximum concurrently executing calls.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Delay before draining after a completion.
    #[serde(default = "default_drain_delay_ms")]
    pub drain_delay_ms: u64,
    /// Deadline for wrapped fetches.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Error message substrings that are swallowed.
    #[serde(default = "default_suppressed_errors")]
    pub suppressed_errors: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            max_concurrent: default_max_concurrent(),
            drain_delay_ms: default_drain_delay_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            suppressed_errors: default_suppressed_errors(),
        }
    }
}

impl GatewaySettings {
    /// Validates gateway limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_window("gateway.min_interval_ms", self.min_interval_ms, 0)?;
        validate_window("gateway.drain_delay_ms", self.drain_delay_ms, 0)?;
        validate_timeout("gateway.fetch_timeout_ms", self.fetch_timeout_ms)?;
        if self.max_concurrent == 0 || self.max_concurrent > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "gateway.max_concurrent must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        if self.suppressed_errors.len() > MAX_SUPPRESSED_ERRORS {
            return Err(ConfigError::Invalid(
                "gateway.suppressed_errors has too many entries".to_string(),
            ));
        }
        for pattern in &self.suppressed_errors {
            if pattern.trim().is_empty() || pattern.len() > MAX_PATTERN_LENGTH {
                return Err(ConfigError::Invalid(
                    "gateway.suppressed_errors entries must be non-empty and bounded".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Converts to the gateway runtime config.
    #[must_use]
    pub fn to_throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            min_interval: Duration::from_millis(self.min_interval_ms),
            max_concurrent: self.max_concurrent,
            drain_delay: Duration::from_millis(self.drain_delay_ms),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            suppressed_errors: self.suppressed_errors.clone(),
        }
    }
}

// ============================================================================
// SECTION: Tracking
// ============================================================================

/// Analytics vendor selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Google Analytics 4.
    GoogleAnalytics,
    /// Meta Pixel.
    MetaPixel,
    /// Google Tag Manager.
    TagManager,
}

impl SinkKind {
    /// Returns the config key of the vendor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GoogleAnalytics => "google_analytics",
            Self::MetaPixel => "meta_pixel",
            Self::TagManager => "tag_manager",
        }
    }
}

/// Per-vendor sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSettings {
    /// Whether the sink is registered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Measurement, pixel, or container id.
    pub id: String,
}

/// `[tracking]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingSettings {
    /// Same-path page view dedup window.
    #[serde(default = "default_page_view_dedup_ms")]
    pub page_view_dedup_ms: u64,
    /// Page view debounce window.
    #[serde(default = "default_page_view_batch_ms")]
    pub page_view_batch_ms: u64,
    /// Product view dedup window.
    #[serde(default = "default_view_content_dedup_ms")]
    pub view_content_dedup_ms: u64,
    /// Cart action dedup window.
    #[serde(default = "default_cart_dedup_ms")]
    pub cart_dedup_ms: u64,
    /// Purchase suppression window.
    #[serde(default = "default_purchase_window_ms")]
    pub purchase_window_ms: u64,
    /// Purchase record retention.
    #[serde(default = "default_purchase_retention_ms")]
    pub purchase_retention_ms: u64,
    /// Bound on orchestrator initialization.
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    /// Per-sink readiness wait.
    #[serde(default = "default_sink_ready_timeout_ms")]
    pub sink_ready_timeout_ms: u64,
    /// Category attached to custom events.
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Currency used when callers omit one.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Google Analytics 4 sink.
    #[serde(default)]
    pub google_analytics: Option<SinkSettings>,
    /// Meta Pixel sink.
    #[serde(default)]
    pub meta_pixel: Option<SinkSettings>,
    /// Google Tag Manager sink.
    #[serde(default)]
    pub tag_manager: Option<SinkSettings>,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            page_view_dedup_ms: default_page_view_dedup_ms(),
            page_view_batch_ms: default_page_view_batch_ms(),
            view_content_dedup_ms: default_view_content_dedup_ms(),
            cart_dedup_ms: default_cart_dedup_ms(),
            purchase_window_ms: default_purchase_window_ms(),
            purchase_retention_ms: default_purchase_retention_ms(),
            init_timeout_ms: default_init_timeout_ms(),
            sink_ready_timeout_ms: default_sink_ready_timeout_ms(),
            default_category: default_category(),
            default_currency: default_currency(),
            google_analytics: None,
            meta_pixel: None,
            tag_manager: None,
        }
    }
}

impl TrackingSettings {
    /// Validates tracking windows and sink ids.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_window("tracking.page_view_dedup_ms", self.page_view_dedup_ms, 1)?;
        validate_window("tracking.page_view_batch_ms", self.page_view_batch_ms, 0)?;
        validate_window("tracking.view_content_dedup_ms", self.view_content_dedup_ms, 1)?;
        validate_window("tracking.cart_dedup_ms", self.cart_dedup_ms, 1)?;
        validate_window("tracking.purchase_window_ms", self.purchase_window_ms, 1)?;
        validate_window("tracking.purchase_retention_ms", self.purchase_retention_ms, 1)?;
        validate_timeout("tracking.init_timeout_ms", self.init_timeout_ms)?;
        validate_timeout("tracking.sink_ready_timeout_ms", self.sink_ready_timeout_ms)?;
        if self.purchase_retention_ms < self.purchase_window_ms {
            return Err(ConfigError::Invalid(
                "tracking.purchase_retention_ms must be at least purchase_window_ms".to_string(),
            ));
        }
        if self.default_category.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tracking.default_category must be non-empty".to_string(),
            ));
        }
        let currency = &self.default_currency;
        if currency.len() != 3 || !currency.bytes().all(|byte| byte.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid(
                "tracking.default_currency must be a three-letter uppercase code".to_string(),
            ));
        }
        for (kind, sink) in self.sinks() {
            if sink.enabled && (sink.id.trim().is_empty() || sink.id.len() > MAX_SINK_ID_LENGTH) {
                return Err(ConfigError::Invalid(format!(
                    "tracking.{}.id must be non-empty and bounded",
                    kind.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Returns configured sinks with their kinds.
    fn sinks(&self) -> impl Iterator<Item = (SinkKind, &SinkSettings)> {
        [
            (SinkKind::GoogleAnalytics, self.google_analytics.as_ref()),
            (SinkKind::MetaPixel, self.meta_pixel.as_ref()),
            (SinkKind::TagManager, self.tag_manager.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, sink)| sink.map(|sink| (kind, sink)))
    }

    /// Returns enabled sinks with their vendor ids.
    #[must_use]
    pub fn enabled_sinks(&self) -> Vec<(SinkKind, String)> {
        self.sinks()
            .filter(|(_, sink)| sink.enabled)
            .map(|(kind, sink)| (kind, sink.id.trim().to_string()))
            .collect()
    }

    /// Converts to the orchestrator runtime config.
    #[must_use]
    pub fn to_tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            page_view_dedup: Duration::from_millis(self.page_view_dedup_ms),
            page_view_batch: Duration::from_millis(self.page_view_batch_ms),
            view_content_dedup: Duration::from_millis(self.view_content_dedup_ms),
            cart_dedup: Duration::from_millis(self.cart_dedup_ms),
            purchase_window: Duration::from_millis(self.purchase_window_ms),
            purchase_retention: Duration::from_millis(self.purchase_retention_ms),
            init_timeout: Duration::from_millis(self.init_timeout_ms),
            sink_ready_timeout: Duration::from_millis(self.sink_ready_timeout_ms),
            default_category: self.default_category.clone(),
            default_currency: self.default_currency.clone(),
        }
    }
}

// ============================================================================
// SECTION: Verify
// ============================================================================

/// `[verify]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifySettings {
    /// Backend base URL; `verify/{order_id}` is appended.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Confirmation view path.
    #[serde(default = "default_confirmation_path")]
    pub confirmation_path: String,
    /// Cart view path.
    #[serde(default = "default_cart_path")]
    pub cart_path: String,
    /// Recover the order id from the redundant store.
    #[serde(default)]
    pub recover_from_store: bool,
    /// Client request timeout.
    #[serde(default = "default_verify_timeout_ms")]
    pub timeout_ms: u64,
    /// Environment variable holding the backend bearer token.
    #[serde(default)]
    pub bearer_token_env: Option<String>,
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            confirmation_path: default_confirmation_path(),
            cart_path: default_cart_path(),
            recover_from_store: false,
            timeout_ms: default_verify_timeout_ms(),
            bearer_token_env: None,
        }
    }
}

impl VerifySettings {
    /// Validates verify settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            parse_base_url(base_url)?;
        }
        validate_view_path("verify.confirmation_path", &self.confirmation_path)?;
        validate_view_path("verify.cart_path", &self.cart_path)?;
        validate_timeout("verify.timeout_ms", self.timeout_ms)?;
        if let Some(name) = &self.bearer_token_env {
            let valid = !name.is_empty()
                && name.len() <= MAX_PATH_COMPONENT_LENGTH
                && name
                    .bytes()
                    .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b'_');
            if !valid {
                return Err(ConfigError::Invalid(
                    "verify.bearer_token_env must be an uppercase environment variable name"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Converts to the controller runtime config.
    #[must_use]
    pub fn to_verify_config(&self) -> VerifyConfig {
        VerifyConfig {
            confirmation_path: self.confirmation_path.clone(),
            cart_path: self.cart_path.clone(),
            recover_from_store: self.recover_from_store,
        }
    }

    /// Builds the HTTP verifier config, reading the bearer token from the
    /// environment. Returns `None` when no base URL is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the URL is invalid or the token
    /// variable is unset.
    pub fn http_verifier_config(&self) -> Result<Option<HttpVerifierConfig>, ConfigError> {
        let Some(base_url) = &self.base_url else {
            return Ok(None);
        };
        let mut config = HttpVerifierConfig::new(parse_base_url(base_url)?);
        config.timeout = Duration::from_millis(self.timeout_ms);
        if let Some(name) = &self.bearer_token_env {
            let token = env::var(name).map_err(|_| {
                ConfigError::Invalid(format!("verify.bearer_token_env {name} is not set"))
            })?;
            config = config.with_bearer_token(token);
        }
        Ok(Some(config))
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    /// `SQLite` database path for the persistent backend.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StorageSettings {
    /// Validates storage settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.sqlite_path {
            validate_path_string("storage.sqlite_path", &path.to_string_lossy())?;
        }
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "storage.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the `SQLite` store config for `path`, or the configured path.
    #[must_use]
    pub fn sqlite_config(&self, path: Option<&Path>) -> Option<SqliteStoreConfig> {
        let path = path.map(Path::to_path_buf).or_else(|| self.sqlite_path.clone())?;
        let mut config = SqliteStoreConfig::new(path);
        config.busy_timeout_ms = self.busy_timeout_ms;
        config.journal_mode = self.journal_mode;
        config.sync_mode = self.sync_mode;
        Some(config)
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Audit disabled.
    None,
}

/// `[audit]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    /// Sink selector.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// File path for the `file` sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditSettings {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }

    /// Opens the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink = FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an absolute view path such as `/cart`.
fn validate_view_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') || value.len() > MAX_VIEW_PATH_LENGTH || value.contains(['?', '#'])
    {
        return Err(ConfigError::Invalid(format!(
            "{field} must be an absolute path without query or fragment"
        )));
    }
    Ok(())
}

/// Validates a millisecond window against `[min, MAX_WINDOW_MS]`.
fn validate_window(field: &str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value < min || value > MAX_WINDOW_MS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min} and {MAX_WINDOW_MS}"
        )));
    }
    Ok(())
}

/// Validates a request timeout.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    let (min, max) = TIMEOUT_RANGE_MS;
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Parses an http(s) base URL.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("verify.base_url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::Invalid(
            "verify.base_url must be an http:// or https:// URL".to_string(),
        ));
    }
    Ok(url)
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default gateway spacing.
const fn default_min_interval_ms() -> u64 {
    250
}

/// Default gateway concurrency.
const fn default_max_concurrent() -> usize {
    5
}

/// Default drain delay.
const fn default_drain_delay_ms() -> u64 {
    50
}

/// Default fetch deadline.
const fn default_fetch_timeout_ms() -> u64 {
    10_000
}

/// Default suppressed error patterns.
fn default_suppressed_errors() -> Vec<String> {
    DEFAULT_SUPPRESSED_ERRORS.iter().map(|pattern| (*pattern).to_string()).collect()
}

/// Default page view dedup window.
const fn default_page_view_dedup_ms() -> u64 {
    2_000
}

/// Default page view debounce window.
const fn default_page_view_batch_ms() -> u64 {
    200
}

/// Default product view dedup window.
const fn default_view_content_dedup_ms() -> u64 {
    3_000
}

/// Default cart dedup window.
const fn default_cart_dedup_ms() -> u64 {
    2_000
}

/// Default purchase suppression window.
const fn default_purchase_window_ms() -> u64 {
    30_000
}

/// Default purchase retention.
const fn default_purchase_retention_ms() -> u64 {
    5 * 60 * 1000
}

/// Default initialization bound.
const fn default_init_timeout_ms() -> u64 {
    15_000
}

/// Default sink readiness wait.
const fn default_sink_ready_timeout_ms() -> u64 {
    8_000
}

/// Default custom event category.
fn default_category() -> String {
    DEFAULT_EVENT_CATEGORY.to_string()
}

/// Default currency.
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Default confirmation view path.
fn default_confirmation_path() -> String {
    VerifyConfig::default().confirmation_path
}

/// Default cart view path.
fn default_cart_path() -> String {
    VerifyConfig::default().cart_path
}

/// Default verify client timeout.
const fn default_verify_timeout_ms() -> u64 {
    30_000
}

/// Default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Serde default for flags that start enabled.
const fn default_true() -> bool {
    true
}
