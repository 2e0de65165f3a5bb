//! # Value Codec
//!
//! Purpose: The serialization boundary between Rust values and the bytes kept
//! in the store.
//!
//! ## Notes
//! - Decoding must fail loudly when the stored bytes do not fit the requested
//!   type; callers rely on that to tell a type mismatch from a miss.
//! - Methods are generic, so a codec is chosen statically as a type parameter
//!   of [`CacheClient`](crate::CacheClient) rather than behind a trait object.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Boxed codec failure, kept as the `source` of cache errors.
pub type CodecError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Encodes values for storage and decodes them back.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON text encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
