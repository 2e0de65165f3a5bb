//! # Cache-Aside Client
//!
//! Purpose: Get-or-load for scalar and set-valued keys, explicit eviction and
//! a pipelined bulk set mutation, all on top of the pooled store client.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `CacheClient` hides pooling, RESP and the codec.
//! 2. **Scoped Connections**: Each store step checks out one connection and
//!    hands it back on every exit path. No connection is held while a loader
//!    runs, so loaders may use the cache themselves.
//! 3. **Loud Failures**: Codec and store errors reach the caller; a value that
//!    fails to decode is an error, never a miss.
//!
//! ## Notes
//! - Get-then-load-then-put is not atomic. Concurrent misses on one key each
//!   run their loader and the last write wins.
//! - `put` without a TTL issues a plain SET, which drops any TTL the key had.
//! - A TTL of zero is sent as-is; the store deletes the key right away.
//! - An empty stored set is indistinguishable from a missing key.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use aside_client::{ClientConfig, KVClient, Pipeline};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::codec::{Codec, JsonCodec};
use crate::config::CacheConfig;
use crate::endpoint::Endpoint;
use crate::error::{CacheError, CacheResult};

/// Cache-aside access to one store endpoint.
///
/// Safe to share between threads; wrap it in an `Arc` or obtain it from a
/// [`CacheRegistry`](crate::CacheRegistry).
pub struct CacheClient<C = JsonCodec> {
    store: KVClient,
    codec: C,
}

impl CacheClient<JsonCodec> {
    /// Client for `endpoint` (`host` or `host:port`) with JSON values.
    pub fn connect(endpoint: &str, config: &CacheConfig) -> CacheResult<Self> {
        let endpoint: Endpoint = endpoint.parse()?;
        Self::new(config.client_config(&endpoint))
    }

    pub fn new(config: ClientConfig) -> CacheResult<Self> {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> CacheClient<C> {
    /// Builds the connection pool; no connection is opened yet.
    pub fn with_codec(config: ClientConfig, codec: C) -> CacheResult<Self> {
        let store = KVClient::with_config(config)?;
        Ok(CacheClient { store, codec })
    }

    /// Address of the backing store.
    pub fn addr(&self) -> &str {
        self.store.addr()
    }

    /// Stores `value` under `key`, then applies `ttl` seconds when given.
    ///
    /// SET and EXPIRE are separate commands. If EXPIRE fails the value stays
    /// stored without an expiry and the error is returned.
    pub fn put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> CacheResult<()> {
        let payload = self.encode(key, value)?;

        let mut conn = self.store.acquire()?;
        conn.set(key.as_bytes(), &payload)?;
        if let Some(seconds) = ttl {
            if let Err(err) = conn.expire(key.as_bytes(), seconds) {
                warn!(
                    key,
                    ttl = seconds,
                    error = %err,
                    "expire failed after set, entry left without ttl"
                );
                return Err(err.into());
            }
        }
        trace!(key, ttl, bytes = payload.len(), "stored value");
        Ok(())
    }

    /// [`put`](Self::put) without a TTL.
    pub fn put_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        self.put(key, value, None)
    }

    /// Looks `key` up without loading. `Ok(None)` on a miss.
    pub fn get_cached<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let stored = self.store.acquire()?.get(key.as_bytes())?;
        stored.map(|bytes| self.decode(key, &bytes)).transpose()
    }

    /// Returns the cached value for `key`, or runs `loader`, stores its
    /// result with `ttl` and returns it.
    ///
    /// Loader errors are returned unchanged and nothing is written.
    pub fn get<T, E, F>(&self, key: &str, loader: F, ttl: Option<u64>) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(cached) = self.get_cached(key)? {
            debug!(key, "cache hit");
            return Ok(cached);
        }

        debug!(key, "cache miss, loading");
        let loaded = loader()?;
        self.put(key, &loaded, ttl)?;
        Ok(loaded)
    }

    /// [`get`](Self::get) without a TTL.
    pub fn get_or_load<T, E, F>(&self, key: &str, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.get(key, loader, None)
    }

    /// Deletes `key`. Returns whether anything was removed.
    pub fn evict(&self, key: &str) -> CacheResult<bool> {
        let removed = self.store.acquire()?.del(key.as_bytes())?;
        debug!(key, removed, "evicted");
        Ok(removed)
    }

    /// Adds every value to the set at `key` with a single SADD.
    ///
    /// Duplicates are collapsed by the store. No values, no command.
    pub fn add_to_set<T, I>(&self, key: &str, values: I) -> CacheResult<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let members = self.encode_members(key, values)?;
        if members.is_empty() {
            return Ok(());
        }

        let added = self.store.acquire()?.sadd(key.as_bytes(), &members)?;
        trace!(key, members = members.len(), added, "added set members");
        Ok(())
    }

    /// Returns the members of the set at `key`, or runs `loader`, adds its
    /// result to the set and returns it.
    ///
    /// A stored empty set counts as a miss.
    pub fn get_members<T, E, F>(&self, key: &str, loader: F) -> Result<HashSet<T>, E>
    where
        T: Serialize + DeserializeOwned + Eq + Hash,
        E: From<CacheError>,
        F: FnOnce() -> Result<HashSet<T>, E>,
    {
        let stored = self
            .store
            .acquire()
            .and_then(|mut conn| conn.smembers(key.as_bytes()))
            .map_err(CacheError::from)?;

        if !stored.is_empty() {
            debug!(key, members = stored.len(), "set hit");
            return stored
                .iter()
                .map(|member| self.decode(key, member).map_err(E::from))
                .collect();
        }

        debug!(key, "set miss, loading");
        let loaded = loader()?;
        self.add_to_set(key, &loaded)?;
        Ok(loaded)
    }

    /// Removes `deletes` members and adds `inserts` members across many keys
    /// in one pipelined round trip.
    ///
    /// Every SREM is queued ahead of every SADD, so a key present in both maps
    /// loses its stale members before gaining the new ones. Everything is
    /// encoded before anything is sent. A failed batch is reported as a whole;
    /// whatever the store already applied stays applied.
    pub fn bulk_set_insert_and_delete<T: Serialize>(
        &self,
        deletes: &HashMap<String, HashSet<T>>,
        inserts: &HashMap<String, HashSet<T>>,
    ) -> CacheResult<()> {
        let removals = self.encode_groups(deletes)?;
        let additions = self.encode_groups(inserts)?;

        let mut pipeline = Pipeline::new();
        for (key, members) in &removals {
            pipeline.srem(key.as_bytes(), members);
        }
        for (key, members) in &additions {
            pipeline.sadd(key.as_bytes(), members);
        }
        if pipeline.is_empty() {
            return Ok(());
        }

        let mut conn = self.store.acquire()?;
        pipeline.query(&mut conn)?;
        debug!(
            removals = removals.len(),
            additions = additions.len(),
            "applied bulk set mutation"
        );
        Ok(())
    }

    fn encode<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<Vec<u8>> {
        self.codec.encode(value).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> CacheResult<T> {
        self.codec.decode(bytes).map_err(|source| CacheError::Deserialization {
            key: key.to_string(),
            source,
        })
    }

    fn encode_members<T, I>(&self, key: &str, values: I) -> CacheResult<Vec<Vec<u8>>>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        values.into_iter().map(|value| self.encode(key, &value)).collect()
    }

    // Keys with nothing to add or remove are dropped.
    fn encode_groups<'a, T: Serialize>(
        &self,
        groups: &'a HashMap<String, HashSet<T>>,
    ) -> CacheResult<Vec<(&'a str, Vec<Vec<u8>>)>> {
        let mut encoded = Vec::with_capacity(groups.len());
        for (key, values) in groups {
            let members = self.encode_members(key, values)?;
            if !members.is_empty() {
                encoded.push((key.as_str(), members));
            }
        }
        Ok(encoded)
    }
}
