//! Error taxonomy for the cache layer.

use aside_client::ClientError;
use thiserror::Error;

use crate::codec::CodecError;

/// Result alias used across the cache layer.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by [`CacheClient`](crate::CacheClient) and
/// [`CacheRegistry`](crate::CacheRegistry). None of them are retried here.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The value could not be encoded; nothing was sent to the store.
    #[error("cannot serialize value for key `{key}`: {source}")]
    Serialization {
        key: String,
        #[source]
        source: CodecError,
    },

    /// The stored bytes do not decode into the requested type.
    #[error("cannot deserialize value at key `{key}`: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: CodecError,
    },

    /// No connection could be acquired, or a command failed in transport or
    /// was rejected by the store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] ClientError),

    /// The endpoint is not `host` or `host:port`.
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint {
        endpoint: String,
        reason: &'static str,
    },
}
