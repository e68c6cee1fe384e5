//! Request gateway: the single entry point for every backend call.
//!
//! Before a request leaves, the gateway attaches the stored bearer token.
//! After a response arrives it normalizes failures into `ApiError`, and on a
//! 401 it tears the session down (credential store cleared, listeners
//! notified) before the caller sees the error.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::models::ApiResponse;

use super::envelope::{build_form, Payload, RequestEnvelope};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Backend used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Reacts to an authorization failure seen by the gateway.
///
/// Called synchronously, after the credential store has been cleared and
/// before the failing call returns.
pub trait UnauthorizedListener: Send + Sync {
    fn on_unauthorized(&self);
}

impl<F> UnauthorizedListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_unauthorized(&self) {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct Gateway {
    client: Client,
    base_url: Url,
    credentials: CredentialStore,
    listeners: RwLock<Vec<Arc<dyn UnauthorizedListener>>>,
}

impl Gateway {
    pub fn new(config: &GatewayConfig, credentials: CredentialStore) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid API base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry a path: {}", config.base_url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Register a listener for authorization failures.
    pub fn on_unauthorized(&self, listener: Arc<dyn UnauthorizedListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Attach `Authorization: Bearer <token>` when a token is stored.
    pub fn decorate(&self, mut envelope: RequestEnvelope) -> Result<RequestEnvelope, ApiError> {
        let token = self.credentials.token().map_err(ApiError::storage)?;
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Unexpected("Stored token is not a valid header value".to_string()))?;
            envelope.headers.insert(header::AUTHORIZATION, value);
        }
        Ok(envelope)
    }

    fn url_for(&self, envelope: &RequestEnvelope) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Unexpected("API base URL cannot carry a path".to_string()))?;
            segments.pop_if_empty();
            segments.extend(&envelope.segments);
        }
        if !envelope.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&envelope.query);
        }
        Ok(url)
    }

    /// Clear stored credentials and tell every listener the session is gone.
    fn invalidate_session(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear credentials after 401");
        }
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener.on_unauthorized();
        }
    }

    /// Decorate, send and decode one request.
    pub async fn send<T: DeserializeOwned>(&self, envelope: RequestEnvelope) -> Result<ApiResponse<T>, ApiError> {
        let envelope = self.decorate(envelope)?;
        let url = self.url_for(&envelope)?;
        let path = envelope.path();
        debug!(method = %envelope.method, path = %path, "Sending request");

        let mut request = self
            .client
            .request(envelope.method, url)
            .headers(envelope.headers);
        request = match envelope.payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(&body),
            Payload::Multipart { fields, image } => request.multipart(build_form(fields, image)?),
        };

        let response = request.send().await.map_err(|e| {
            warn!(path = %path, error = %e, "Request failed before a response arrived");
            ApiError::from_transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(path = %path, "Authorization rejected, ending session");
            self.invalidate_session();
            // The session is gone whether or not the body can be read
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let body = response.text().await.map_err(ApiError::from_transport)?;
        if !status.is_success() {
            debug!(path = %path, status = status.as_u16(), "Request failed");
            return Err(ApiError::from_status(status, &body));
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            ApiError::Unexpected(format!("Failed to parse JSON response from {}: {}", path, e))
        })?;
        if !parsed.success {
            return Err(ApiError::rejected(status, parsed.message, parsed.errors));
        }
        Ok(parsed)
    }
}
