//! Per-endpoint client registry.
//!
//! The registry is an ordinary value owned by the application and passed to
//! whoever needs a cache. The same endpoint string always yields the same
//! `Arc<CacheClient>`; lookup and creation share one critical section so
//! racing first callers cannot build duplicate pools. Endpoint strings are
//! compared verbatim, so `"localhost"` and `"localhost:6379"` are distinct.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::cache::CacheClient;
use crate::codec::{Codec, JsonCodec};
use crate::config::CacheConfig;
use crate::endpoint::Endpoint;
use crate::error::CacheResult;

pub struct CacheRegistry<C = JsonCodec> {
    config: CacheConfig,
    codec: C,
    clients: Mutex<HashMap<String, Arc<CacheClient<C>>>>,
}

impl CacheRegistry<JsonCodec> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec + Clone> CacheRegistry<C> {
    /// Registry whose clients all use `codec`.
    pub fn with_codec(config: CacheConfig, codec: C) -> Self {
        CacheRegistry {
            config,
            codec,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client for `endpoint`, creating it on first use.
    ///
    /// Fails with `InvalidEndpoint` when `endpoint` is not `host[:port]`; in
    /// that case nothing is registered.
    pub fn get_instance(&self, endpoint: &str) -> CacheResult<Arc<CacheClient<C>>> {
        let mut clients = self.lock();
        if let Some(client) = clients.get(endpoint) {
            return Ok(Arc::clone(client));
        }

        let parsed: Endpoint = endpoint.parse()?;
        let client = Arc::new(CacheClient::with_codec(
            self.config.client_config(&parsed),
            self.codec.clone(),
        )?);
        clients.insert(endpoint.to_string(), Arc::clone(&client));
        info!(endpoint, addr = %parsed, "registered cache client");
        Ok(client)
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CacheClient<C>>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
