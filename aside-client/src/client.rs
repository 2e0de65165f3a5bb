//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing Redis-compatible
//! commands over RESP2, one pooled connection per call.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling and protocol details.
//! 2. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::Pipeline;
use crate::pool::{ConnectionPool, PooledConnection};
use crate::resp::RespValue;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Pool is at capacity and no connection became available in time.
    #[error("connection pool exhausted")]
    PoolExhausted,
    /// Address could not be resolved into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// TTL state returned by the server, mirroring Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTtl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// Configuration for the synchronous client and its pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379" or "cache.internal:6379".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// How long `acquire` waits for a free slot. `None` fails immediately.
    pub acquire_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            acquire_timeout: Some(Duration::from_secs(2)),
        }
    }
}

/// Synchronous client with connection pooling.
///
/// Each single-command call acquires a connection, executes the command, and
/// returns the connection to the pool. Callers that need several commands on
/// one connection use [`KVClient::acquire`] directly.
#[derive(Clone)]
pub struct KVClient {
    pool: ConnectionPool,
}

impl KVClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let config = ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration.
    ///
    /// No connection is opened until the first command.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool = ConnectionPool::new(config)?;
        Ok(KVClient { pool })
    }

    /// Server address this client talks to.
    pub fn addr(&self) -> &str {
        self.pool.addr()
    }

    /// Borrows a connection for a multi-command sequence.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        self.pool.acquire()
    }

    /// Fetches a value by key. Returns `Ok(None)` when the key is missing.
    pub fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.acquire()?.get(key)
    }

    /// Sets a value for a key without expiration.
    pub fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        self.acquire()?.set(key, value)
    }

    /// Deletes a key. Returns true when a key was removed.
    pub fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        self.acquire()?.del(key)
    }

    /// Sets a time-to-live on a key. Returns true when the TTL was set.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> ClientResult<bool> {
        self.acquire()?.expire(key, ttl.as_secs())
    }

    /// Returns TTL status for a key.
    pub fn ttl(&self, key: &[u8]) -> ClientResult<ClientTtl> {
        self.acquire()?.ttl(key)
    }

    /// Adds members to the set at `key`. Returns the number newly added.
    pub fn sadd<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> ClientResult<u64> {
        self.acquire()?.sadd(key, members)
    }

    /// Removes members from the set at `key`. Returns the number removed.
    pub fn srem<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> ClientResult<u64> {
        self.acquire()?.srem(key, members)
    }

    /// Lists all members of the set at `key`; empty when the key is missing.
    pub fn smembers(&self, key: &[u8]) -> ClientResult<Vec<Vec<u8>>> {
        self.acquire()?.smembers(key)
    }

    /// Pings the server. Returns the raw response payload.
    pub fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        self.acquire()?.ping(payload)
    }

    /// Sends every queued command in one round trip.
    pub fn pipeline(&self, pipeline: &Pipeline) -> ClientResult<Vec<RespValue>> {
        let mut conn = self.acquire()?;
        pipeline.query(&mut conn)
    }
}
