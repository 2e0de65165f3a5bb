//! Configuration Module
//!
//! Pool settings applied to every client a registry creates. Values come from
//! defaults, a deserialized document, or `ASIDE_*` environment variables.

use std::env;
use std::time::Duration;

use aside_client::ClientConfig;
use serde::Deserialize;

use crate::endpoint::Endpoint;

/// Connection settings shared by all endpoints.
///
/// Timeouts are in milliseconds; an absent timeout means "wait forever", except
/// for `acquire_timeout_ms` where absent means "fail as soon as the pool is
/// full".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum idle connections kept per endpoint
    pub max_idle: usize,
    /// Maximum open connections per endpoint
    pub max_total: usize,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
}

impl CacheConfig {
    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `ASIDE_MAX_IDLE` - Idle connections kept (default: 8)
    /// - `ASIDE_MAX_TOTAL` - Open connections allowed (default: 16)
    /// - `ASIDE_READ_TIMEOUT_MS` - Socket read timeout (default: none)
    /// - `ASIDE_WRITE_TIMEOUT_MS` - Socket write timeout (default: none)
    /// - `ASIDE_CONNECT_TIMEOUT_MS` - Connect timeout (default: none)
    /// - `ASIDE_ACQUIRE_TIMEOUT_MS` - Wait for a pooled connection (default: 2000)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_idle: env_value("ASIDE_MAX_IDLE").unwrap_or(defaults.max_idle),
            max_total: env_value("ASIDE_MAX_TOTAL").unwrap_or(defaults.max_total),
            read_timeout_ms: env_value("ASIDE_READ_TIMEOUT_MS").or(defaults.read_timeout_ms),
            write_timeout_ms: env_value("ASIDE_WRITE_TIMEOUT_MS").or(defaults.write_timeout_ms),
            connect_timeout_ms: env_value("ASIDE_CONNECT_TIMEOUT_MS")
                .or(defaults.connect_timeout_ms),
            acquire_timeout_ms: env_value("ASIDE_ACQUIRE_TIMEOUT_MS")
                .or(defaults.acquire_timeout_ms),
        }
    }

    /// Transport settings for one endpoint.
    pub fn client_config(&self, endpoint: &Endpoint) -> ClientConfig {
        ClientConfig {
            addr: endpoint.address(),
            max_idle: self.max_idle,
            max_total: self.max_total,
            read_timeout: self.read_timeout_ms.map(Duration::from_millis),
            write_timeout: self.write_timeout_ms.map(Duration::from_millis),
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            acquire_timeout: self.acquire_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_idle: 8,
            max_total: 16,
            read_timeout_ms: None,
            write_timeout_ms: None,
            connect_timeout_ms: None,
            acquire_timeout_ms: Some(2_000),
        }
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
