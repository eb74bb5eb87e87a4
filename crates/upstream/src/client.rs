//! Shared pooled HTTP client, built lazily and torn down explicitly.
//!
//! This is the only component that holds live network resources. Everything
//! else borrows the client for the duration of one call.

use crate::config::GatewayConfig;
use crate::error::{ApiError, Result};
use parking_lot::RwLock;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

const USER_AGENT_VALUE: &str = concat!("toolgate/", env!("CARGO_PKG_VERSION"));

/// Handle to the process-wide upstream client.
///
/// Cheap to clone; clones share the pooled client and the in-flight permit
/// pool.
#[derive(Clone)]
pub struct ClientHandle {
    inner: Arc<ClientHandleInner>,
}

struct ClientHandleInner {
    config: GatewayConfig,
    client: RwLock<Option<Client>>,
    // reqwest pools per host with no total-connection cap, so the "max total
    // connections" bound is a permit held across each in-flight call.
    permits: Arc<Semaphore>,
}

impl ClientHandle {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Self {
            inner: Arc::new(ClientHandleInner {
                config,
                client: RwLock::new(None),
                permits,
            }),
        }
    }

    /// Get the shared pooled client, constructing it on first use.
    ///
    /// Construction is double-checked under the write lock so concurrent
    /// first use builds at most one client. A missing credential degrades to
    /// an unauthenticated client; failure is deferred to the first real
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unavailable`] when no base address is configured
    /// (or it is not a valid URL); terminal for every higher layer.
    pub fn acquire(&self) -> Result<Client> {
        if let Some(client) = self.inner.client.read().as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.inner.client.write();
        if let Some(client) = slot.as_ref() {
            // Lost the construction race; reuse the winner's client.
            return Ok(client.clone());
        }

        self.check_base_url()?;
        let client = self.build_client()?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Tear down the pooled client and free its connections.
    ///
    /// Safe to call when no client exists; the next `acquire` rebuilds.
    pub fn release(&self) {
        *self.inner.client.write() = None;
    }

    /// Reserve one in-flight call slot, waiting if the pool is saturated.
    ///
    /// The permit must be held for the duration of the upstream call.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unknown`] if the permit pool is unexpectedly
    /// closed.
    pub async fn in_flight_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ApiError::Unknown(format!("connection permit pool closed: {e}")))
    }

    /// Absolute URL for an endpoint path under the configured base address.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unavailable`] for a missing base address and
    /// [`ApiError::Validation`] for a path that does not form a valid URL.
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.check_base_url()?;
        let base = self.inner.config.base_url.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| ApiError::Validation(format!("invalid request path '{path}': {e}")))
    }

    fn check_base_url(&self) -> Result<()> {
        let base = self.inner.config.base_url.trim();
        if base.is_empty() {
            return Err(ApiError::Unavailable(
                "no upstream base URL is configured".to_string(),
            ));
        }
        Url::parse(base)
            .map_err(|e| ApiError::Unavailable(format!("invalid upstream base URL '{base}': {e}")))?;
        Ok(())
    }

    fn build_client(&self) -> Result<Client> {
        let cfg = &self.inner.config;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(key) = cfg.api_key.as_deref()
            && let Ok(v) = HeaderValue::from_str(&format!("Bearer {key}"))
        {
            headers.insert(AUTHORIZATION, v);
        }

        Client::builder()
            .default_headers(headers)
            .timeout(cfg.timeout)
            .pool_max_idle_per_host(cfg.max_keepalive_connections)
            .build()
            .map_err(|e| ApiError::Unavailable(format!("failed to build HTTP client: {e}")))
    }
}
