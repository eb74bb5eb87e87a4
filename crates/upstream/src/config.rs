//! Gateway configuration.
//!
//! The embedding process reads configuration once at startup and passes it
//! in as plain values; `from_env` covers the common deployment where the
//! values come straight from the environment.

use std::time::Duration;

/// Configuration consumed by [`crate::gateway::ApiGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream base address. Empty means the gateway is unavailable and
    /// every operation fails terminally.
    pub base_url: String,
    /// Bearer credential for the `Authorization` header. `None` degrades to
    /// unauthenticated calls rather than failing construction.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Time-to-live for cached responses.
    pub cache_ttl: Duration,
    /// Total attempts per operation (first try included).
    pub max_retries: u32,
    /// Delay before the first re-attempt.
    pub initial_retry_delay: Duration,
    /// Exponential backoff base.
    pub retry_multiplier: f64,
    /// Bound on concurrent in-flight upstream calls.
    pub max_connections: usize,
    /// Bound on idle keep-alive connections per host.
    pub max_keepalive_connections: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(1),
            retry_multiplier: 2.0,
            max_connections: 10,
            max_keepalive_connections: 5,
        }
    }
}

impl GatewayConfig {
    /// Build a configuration from the process environment.
    ///
    /// Reads `API_BASE_URL`, `API_KEY`, `API_TIMEOUT` (seconds), `CACHE_TTL`
    /// (seconds), and `MAX_RETRIES`; unset or unparsable values fall back to
    /// the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base_url) = std::env::var("API_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg.api_key = std::env::var("API_KEY").ok().filter(|s| !s.is_empty());
        if let Some(timeout) = env_secs("API_TIMEOUT") {
            cfg.timeout = timeout;
        }
        if let Some(ttl) = env_secs("CACHE_TTL") {
            cfg.cache_ttl = ttl;
        }
        if let Some(max_retries) = env_parsed("MAX_RETRIES") {
            cfg.max_retries = max_retries;
        }
        cfg
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parsed::<u64>(name).map(Duration::from_secs)
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}
