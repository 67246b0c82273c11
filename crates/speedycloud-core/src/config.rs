//! Client configuration.
//!
//! Provides [`ClientConfig`] for configuring SpeedyCloud clients. Values can be
//! set through the builder or loaded from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::SpeedyCloudResult;
use crate::types::Endpoint;

/// Client configuration shared by the object-storage and product-API clients.
///
/// # Examples
///
/// ```
/// use speedycloud_core::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.pool_size, 10);
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Host serving the object-storage API.
    #[builder(default = String::from("osc.speedycloud.net"))]
    pub object_storage_host: String,

    /// Host serving the product-management API.
    #[builder(default = String::from("api.speedycloud.cn"))]
    pub product_api_host: String,

    /// Protocol scheme (`"http"` or `"https"`).
    #[builder(default = String::from("http"))]
    pub protocol: String,

    /// Number of connections each pool keeps as its floor.
    #[builder(default = 10)]
    pub pool_size: usize,

    /// Attempts per logical request before a transport error is surfaced.
    #[builder(default = 5)]
    pub max_attempts: u32,

    /// Pause before retrying after a connection-level failure on attempts 2 and 3.
    #[builder(default = 1_000)]
    pub retry_backoff_ms: u64,

    /// Deadline for opening a connection (TCP connect plus TLS handshake).
    #[builder(default = 10_000)]
    pub connect_timeout_ms: u64,

    /// Deadline for one request attempt, from send to full response body.
    #[builder(default = 60_000)]
    pub request_timeout_ms: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            object_storage_host: String::from("osc.speedycloud.net"),
            product_api_host: String::from("api.speedycloud.cn"),
            protocol: String::from("http"),
            pool_size: 10,
            max_attempts: 5,
            retry_backoff_ms: 1_000,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
            log_level: String::from("info"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SPEEDYCLOUD_OBJECT_STORAGE_HOST` | `osc.speedycloud.net` |
    /// | `SPEEDYCLOUD_PRODUCT_API_HOST` | `api.speedycloud.cn` |
    /// | `SPEEDYCLOUD_PROTOCOL` | `http` |
    /// | `SPEEDYCLOUD_POOL_SIZE` | `10` |
    /// | `SPEEDYCLOUD_MAX_ATTEMPTS` | `5` |
    /// | `SPEEDYCLOUD_RETRY_BACKOFF_MS` | `1000` |
    /// | `SPEEDYCLOUD_CONNECT_TIMEOUT_MS` | `10000` |
    /// | `SPEEDYCLOUD_REQUEST_TIMEOUT_MS` | `60000` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparsable numeric values are ignored and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SPEEDYCLOUD_OBJECT_STORAGE_HOST") {
            config.object_storage_host = v;
        }
        if let Ok(v) = std::env::var("SPEEDYCLOUD_PRODUCT_API_HOST") {
            config.product_api_host = v;
        }
        if let Ok(v) = std::env::var("SPEEDYCLOUD_PROTOCOL") {
            config.protocol = v;
        }
        if let Some(n) = env_number("SPEEDYCLOUD_POOL_SIZE") {
            config.pool_size = n;
        }
        if let Some(n) = env_number("SPEEDYCLOUD_MAX_ATTEMPTS") {
            config.max_attempts = n;
        }
        if let Some(n) = env_number("SPEEDYCLOUD_RETRY_BACKOFF_MS") {
            config.retry_backoff_ms = n;
        }
        if let Some(n) = env_number("SPEEDYCLOUD_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = n;
        }
        if let Some(n) = env_number("SPEEDYCLOUD_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = n;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Endpoint of the object-storage API.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when `protocol` is unsupported.
    pub fn object_storage_endpoint(&self) -> SpeedyCloudResult<Endpoint> {
        Endpoint::parse(&self.object_storage_host, &self.protocol)
    }

    /// Endpoint of the product-management API.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when `protocol` is unsupported.
    pub fn product_api_endpoint(&self) -> SpeedyCloudResult<Endpoint> {
        Endpoint::parse(&self.product_api_host, &self.protocol)
    }

    /// Backoff between attempts as a [`Duration`].
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Connect deadline as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-attempt deadline as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
