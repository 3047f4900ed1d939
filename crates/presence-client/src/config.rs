//! Client configuration
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Reconciler and transport settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root of the HTTP fallback routes, e.g. `http://host:5000`
    pub base_url: String,
    /// WebSocket endpoint of the push channel
    pub gateway_url: String,
    /// How long the push handshake may take before the fallback is activated
    pub handshake_timeout_ms: u64,
    /// Fallback poll interval
    pub poll_interval_ms: u64,
    /// Heartbeat interval; `None` uses the interval announced in Hello
    pub heartbeat_interval_ms: Option<u64>,
    /// Per-request timeout of the fallback transport
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    /// Build a config for a server root, deriving the gateway URL from it
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            gateway_url: gateway_url_for(&base_url),
            base_url,
            handshake_timeout_ms: 5_000,
            poll_interval_ms: 5_000,
            heartbeat_interval_ms: None,
            request_timeout_ms: 10_000,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ClientConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup("PRESENCE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));

        if let Some(url) = lookup("PRESENCE_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Some(ms) = parse(&lookup, "PRESENCE_HANDSHAKE_TIMEOUT_MS")? {
            config.handshake_timeout_ms = ms;
        }
        if let Some(ms) = parse(&lookup, "PRESENCE_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = parse(&lookup, "PRESENCE_HEARTBEAT_INTERVAL_MS")? {
            config.heartbeat_interval_ms = Some(ms);
        }
        if let Some(ms) = parse(&lookup, "PRESENCE_REQUEST_TIMEOUT_MS")? {
            config.request_timeout_ms = ms;
        }

        if config.poll_interval_ms == 0 {
            return Err(ClientConfigError::InvalidValue(
                "PRESENCE_POLL_INTERVAL_MS",
                "0".to_string(),
            ));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = (interval.as_millis() as u64).max(1);
        self
    }

    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// `http://host` becomes `ws://host/gateway`, `https://host` becomes `wss://host/gateway`
fn gateway_url_for(base_url: &str) -> String {
    let ws = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{ws}/gateway")
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ClientConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ClientConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
