// crates/storefront-gateway/src/http.rs
// ============================================================================
// Module: Storefront HTTP Order Verifier
// Description: HTTP client for the backend order verification endpoint.
// Purpose: Resolve an order id into a verification result over HTTP.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! `HttpOrderVerifier` issues `GET {base_url}/verify/{order_id}` and decodes
//! the JSON body into a [`VerificationResult`]. The order id is appended as a
//! single percent-encoded path segment. Redirects are refused and response
//! bodies are size-limited.
//!
//! A non-success status with a decodable JSON body is still returned as a
//! result (the backend reports `success: false` that way); otherwise the status
//! becomes [`OutboundError::Http`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use storefront_core::OrderId;
use storefront_core::OrderVerifier;
use storefront_core::OutboundError;
use storefront_core::VerificationResult;
use url::Url;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted response body size.
pub const MAX_RESPONSE_BYTES: usize = 256 * 1024;

/// Default per-request client timeout. The gateway deadline usually fires first.
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// HTTP verifier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpVerifierConfig {
    /// Backend base URL; `verify/{order_id}` is appended.
    pub base_url: Url,
    /// Optional bearer token sent with each request.
    pub bearer_token: Option<String>,
    /// Client-level request timeout.
    pub timeout: Duration,
}

impl HttpVerifierConfig {
    /// Creates settings for the given base URL.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            bearer_token: None,
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// HTTP-backed order verifier.
#[derive(Debug, Clone)]
pub struct HttpOrderVerifier {
    /// HTTP client used for verify requests.
    client: Client,
    /// Verifier settings.
    config: HttpVerifierConfig,
}

impl HttpOrderVerifier {
    /// Builds a verifier with a default client.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::InvalidRequest`] when the base URL cannot carry
    /// path segments or the client cannot be constructed.
    pub fn new(config: HttpVerifierConfig) -> Result<Self, OutboundError> {
        if config.base_url.cannot_be_a_base() {
            return Err(OutboundError::InvalidRequest(format!(
                "base url cannot be a base: {}",
                config.base_url
            )));
        }
        match config.base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(OutboundError::InvalidRequest(format!(
                    "unsupported scheme: {scheme}"
                )));
            }
        }
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .build()
            .map_err(|err| OutboundError::InvalidRequest(err.to_string()))?;
        Ok(Self {
            client,
            config,
        })
    }

    /// Returns the verify URL for an order id.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::InvalidRequest`] when the URL cannot be built.
    pub fn verify_url(&self, order_id: &OrderId) -> Result<Url, OutboundError> {
        let mut url = self.config.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                OutboundError::InvalidRequest("base url cannot be a base".to_string())
            })?;
            segments.pop_if_empty().push("verify").push(order_id.as_str());
        }
        Ok(url)
    }
}

#[async_trait]
impl OrderVerifier for HttpOrderVerifier {
    async fn verify(&self, order_id: &OrderId) -> Result<VerificationResult, OutboundError> {
        let url = self.verify_url(order_id)?;
        let mut request = self.client.get(url.as_str()).header(ACCEPT, "application/json");
        if let Some(token) = &self.config.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let timeout = self.config.timeout;
        let mut response = request.send().await.map_err(|err| classify(&err, timeout))?;
        let status = response.status();
        if status.is_redirection() {
            return Err(OutboundError::Http {
                status: status.as_u16(),
            });
        }
        if let Some(length) = response.content_length()
            && length > MAX_RESPONSE_BYTES as u64
        {
            return Err(OutboundError::InvalidResponse(format!(
                "response exceeds {MAX_RESPONSE_BYTES} bytes"
            )));
        }
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| classify(&err, timeout))? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_RESPONSE_BYTES {
                return Err(OutboundError::InvalidResponse(format!(
                    "response exceeds {MAX_RESPONSE_BYTES} bytes"
                )));
            }
        }
        match serde_json::from_slice::<VerificationResult>(&body) {
            Ok(result) => Ok(result),
            Err(_) if !status.is_success() => Err(OutboundError::Http {
                status: status.as_u16(),
            }),
            Err(err) => Err(OutboundError::InvalidResponse(err.to_string())),
        }
    }
}

/// Maps a transport error onto the outbound error taxonomy.
fn classify(err: &reqwest::Error, timeout: Duration) -> OutboundError {
    if err.is_timeout() {
        OutboundError::Timeout {
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if let Some(status) = err.status() {
        OutboundError::Http {
            status: status.as_u16(),
        }
    } else {
        OutboundError::Network(err.to_string())
    }
}
