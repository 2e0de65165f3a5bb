//! # AsideKV Cache-Aside Layer
//!
//! Purpose: Read-through caching over a remote Redis-compatible store. A
//! lookup that misses calls the caller's loader, writes the result back with
//! an optional TTL, and returns it. Set-valued keys get the same treatment,
//! plus a pipelined bulk insert/delete across many keys.
//!
//! ## Design Principles
//! 1. **Store Is the Truth**: Nothing is cached in process; every call goes to
//!    the store.
//! 2. **Typed Boundary**: Values cross the wire through a [`Codec`], decoded
//!    into a type chosen at compile time.
//! 3. **No Hidden Coordination**: Concurrent misses may all run their loaders;
//!    the last write wins.
//! 4. **Explicit Ownership**: A [`CacheRegistry`] owned by the application
//!    hands out one client per endpoint.
//!
//! ```no_run
//! use aside_cache::{CacheConfig, CacheError, CacheRegistry};
//!
//! let registry = CacheRegistry::new(CacheConfig::from_env());
//! let cache = registry.get_instance("localhost:6379")?;
//! let load = || Ok::<_, CacheError>("hello".to_string());
//! let greeting: String = cache.get("greeting", load, Some(60))?;
//! # Ok::<(), CacheError>(())
//! ```

mod cache;
mod codec;
mod config;
mod endpoint;
mod error;
mod registry;

pub use aside_client::{ClientConfig, ClientError};
pub use cache::CacheClient;
pub use codec::{Codec, CodecError, JsonCodec};
pub use config::CacheConfig;
pub use endpoint::{Endpoint, DEFAULT_PORT};
pub use error::{CacheError, CacheResult};
pub use registry::CacheRegistry;
