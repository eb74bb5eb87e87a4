//! The gateway service object.
//!
//! One `ApiGateway` is constructed by the process entry point and passed to
//! every caller; it owns the client handle, the response cache, and the
//! retry policy. A single operation probes the cache (reads only), runs the
//! live call under the retry engine on a miss, writes back or invalidates,
//! and wraps the outcome in an envelope.

use crate::batch::{self, BatchResult};
use crate::cache::{CacheStats, ResponseCache, cache_key};
use crate::client::ClientHandle;
use crate::config::GatewayConfig;
use crate::envelope::Envelope;
use crate::error::{ApiError, Result};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the gateway core. Cheap to clone and safe to share across
/// tasks; clones share the pooled client and the cache.
#[derive(Clone)]
pub struct ApiGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: ClientHandle,
    cache: ResponseCache,
    retry: RetryPolicy,
}

/// Upstream reachability report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub api_reachable: bool,
    pub status_code: Option<u16>,
    pub healthy: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApiGateway {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let cache = ResponseCache::new(config.cache_ttl);
        let retry = RetryPolicy {
            max_attempts: config.max_retries,
            initial_delay: config.initial_retry_delay,
            multiplier: config.retry_multiplier,
        };
        Self {
            inner: Arc::new(GatewayInner {
                client: ClientHandle::new(config),
                cache,
                retry,
            }),
        }
    }

    /// GET an endpoint, serving from cache when possible.
    ///
    /// A miss performs the live call under the retry policy and writes the
    /// decoded body back into the cache on success.
    pub async fn get(&self, path: &str, use_cache: bool) -> Envelope {
        let key = cache_key(&Method::GET, path);
        if use_cache
            && let Some(value) = self.inner.cache.get(&key)
        {
            tracing::debug!(key = %key, "cache hit");
            return Envelope::success(value, true);
        }

        match self.call_with_retry(Method::GET, path, None).await {
            Ok((_, value)) => {
                if use_cache {
                    self.inner.cache.insert(key, value.clone());
                }
                Envelope::success(value, false)
            }
            Err(e) => self.failure(path, &e),
        }
    }

    /// POST a JSON body to an endpoint.
    ///
    /// A successful write invalidates every cached read mentioning the
    /// path's collection segment (`/users/42` invalidates `users`), so
    /// sibling reads never serve stale data.
    pub async fn post(&self, path: &str, body: &Value) -> Envelope {
        match self.call_with_retry(Method::POST, path, Some(body)).await {
            Ok((_, value)) => {
                let removed = self.inner.cache.invalidate(Some(collection_segment(path)));
                tracing::debug!(path = %path, removed, "invalidated cached reads after write");
                Envelope::success(value, false)
            }
            Err(e) => self.failure(path, &e),
        }
    }

    /// PUT a JSON body to an endpoint, invalidating cached reads of the
    /// path itself.
    pub async fn put(&self, path: &str, body: &Value) -> Envelope {
        match self.call_with_retry(Method::PUT, path, Some(body)).await {
            Ok((_, value)) => {
                let removed = self.inner.cache.invalidate(Some(path));
                tracing::debug!(path = %path, removed, "invalidated cached reads after write");
                Envelope::success(value, false)
            }
            Err(e) => self.failure(path, &e),
        }
    }

    /// DELETE an endpoint, invalidating cached reads of the path itself.
    pub async fn delete(&self, path: &str) -> Envelope {
        match self.call_with_retry(Method::DELETE, path, None).await {
            Ok((status, _)) => {
                let removed = self.inner.cache.invalidate(Some(path));
                tracing::debug!(path = %path, removed, "invalidated cached reads after delete");
                Envelope::success(json!({ "status_code": status, "deleted": true }), false)
            }
            Err(e) => self.failure(path, &e),
        }
    }

    /// Fan independent GETs out concurrently; see [`batch::dispatch_all`].
    pub async fn batch_get(&self, paths: &[String], use_cache: bool) -> BatchResult {
        batch::dispatch_all(self, paths, use_cache).await
    }

    /// Remove cached entries matching `pattern` (substring), or all entries
    /// when no pattern is given. Returns the number removed.
    pub fn invalidate_cache(&self, pattern: Option<&str>) -> usize {
        let removed = self.inner.cache.invalidate(pattern);
        tracing::debug!(pattern = pattern.unwrap_or("<all>"), removed, "cache invalidated");
        removed
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Probe upstream reachability via `GET /health`, bypassing cache and
    /// retry with a short fixed timeout.
    pub async fn health(&self) -> HealthStatus {
        let probe: Result<u16> = async {
            let client = self.inner.client.acquire()?;
            let url = self.inner.client.endpoint_url("/health")?;
            let response = client
                .get(url)
                .timeout(HEALTH_PROBE_TIMEOUT)
                .send()
                .await
                .map_err(|e| ApiError::from_reqwest(&e))?;
            Ok(response.status().as_u16())
        }
        .await;

        match probe {
            Ok(status) => HealthStatus {
                api_reachable: true,
                status_code: Some(status),
                healthy: status == 200,
                error: None,
                timestamp: Utc::now(),
            },
            Err(e) => HealthStatus {
                api_reachable: false,
                status_code: None,
                healthy: false,
                error: Some(e.to_string()),
                timestamp: Utc::now(),
            },
        }
    }

    /// Tear down the pooled client. The gateway stays usable; the next
    /// operation rebuilds the client.
    pub fn shutdown(&self) {
        self.inner.client.release();
    }

    async fn call_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(u16, Value)> {
        self.inner
            .retry
            .execute(|| self.call_once(method.clone(), path, body))
            .await
    }

    /// One live upstream call: returns the status and decoded body on 2xx,
    /// a classified error otherwise.
    async fn call_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(u16, Value)> {
        let client = self.inner.client.acquire()?;
        let url = self.inner.client.endpoint_url(path)?;
        let _permit = self.inner.client.in_flight_permit().await?;

        let mut request = client.request(method, url);
        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        if status.is_success() {
            Ok((status.as_u16(), decode_body(&text)))
        } else {
            Err(ApiError::from_status(status.as_u16(), &text))
        }
    }

    fn failure(&self, path: &str, err: &ApiError) -> Envelope {
        tracing::warn!(path = %path, error = %err, "upstream operation failed");
        Envelope::failure_for(err, path)
    }
}

/// Decode a response body as JSON, falling back to a plain string value for
/// non-JSON payloads. Empty bodies decode to `null`.
fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// First path segment of an endpoint: the collection a write lands in.
fn collection_segment(path: &str) -> &str {
    match path.trim_start_matches('/').split('/').next() {
        Some(seg) if !seg.is_empty() => seg,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_segment_takes_the_first_segment() {
        assert_eq!(collection_segment("/users/42"), "users");
        assert_eq!(collection_segment("/users"), "users");
        assert_eq!(collection_segment("users/42"), "users");
        assert_eq!(collection_segment("/"), "/");
    }

    #[test]
    fn decode_body_falls_back_to_string() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body(r#"{"a":1}"#), json!({"a":1}));
        assert_eq!(decode_body("plain text"), json!("plain text"));
    }
}
