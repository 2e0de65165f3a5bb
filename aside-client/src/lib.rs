//! # AsideKV Store Client
//!
//! Purpose: Provide a lightweight, synchronous Redis-compatible client with
//! connection pooling and pipelining, used as the transport underneath the
//! cache-aside layer.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections to avoid repeated connects.
//! 2. **Scoped Acquisition**: A pooled connection is released when its guard drops.
//! 3. **Batching**: Pipelines encode many commands into one write and one flush.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.

mod client;
mod commands;
mod pipeline;
mod pool;
mod resp;

pub use client::{ClientConfig, ClientError, ClientResult, ClientTtl, KVClient};
pub use pipeline::Pipeline;
pub use pool::{ConnectionPool, PooledConnection};
pub use resp::RespValue;
