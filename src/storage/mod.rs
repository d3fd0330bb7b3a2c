//! Storage backends for rate limiter state.
//!
//! The contract is two orthogonal primitives behind one trait: an atomic
//! integer counter with TTL (used by the fixed window engine and the block
//! override) and opaque JSON document storage with TTL (used by the other
//! three engines). Adapters move bytes; JSON encoding and decoding happen in
//! the engines.
//!
//! The trait is public so callers can plug additional backends; adapters must
//! be safe for concurrent use from multiple tasks.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{FragmaError, Options, StoreClient, StoreType};

mod memory;
pub use memory::*;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::*;

#[cfg(feature = "memcached")]
mod memcached;
#[cfg(feature = "memcached")]
pub use memcached::*;

/// Storage primitives required by the rate limiting engines.
///
/// Semantics every implementation must honor:
/// - `increment` is atomic with respect to concurrent increments of the same
///   key and sets the TTL when the key is created. Whether the TTL is also
///   refreshed on later increments is backend-specific; callers must not
///   depend on it beyond the fixed window's window-bounded counters.
/// - `get` on a missing key returns 0, not an error.
/// - `reset` on a missing key succeeds.
/// - `get_json` on a missing key returns `None`, not an error.
/// - `close` is idempotent; any other operation after `close` fails with
///   [`FragmaError::StorageClosed`] or a backend error.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Atomically add `amount` to the counter at `key` and return the new count.
    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> Result<u64, FragmaError>;

    /// Read the counter at `key`. Missing keys read as 0.
    async fn get(&self, key: &str) -> Result<u64, FragmaError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn reset(&self, key: &str) -> Result<(), FragmaError>;

    /// Store an opaque JSON document at `key` with the given TTL.
    async fn set_json(&self, key: &str, json: &[u8], ttl: Duration) -> Result<(), FragmaError>;

    /// Read the JSON document at `key`, or `None` when absent.
    async fn get_json(&self, key: &str) -> Result<Option<Vec<u8>>, FragmaError>;

    /// Release adapter-owned resources.
    async fn close(&self) -> Result<(), FragmaError>;
}

/// Select the storage adapter for `options`, consuming its client handle.
///
/// An explicit `store_type` wins; otherwise the client handle's runtime type
/// decides, and anything unrecognized (or no client at all) falls through to
/// in-memory storage.
pub(crate) fn init_storage(options: &mut Options) -> Result<Arc<dyn Storage>, FragmaError> {
    let client = options.store_client.take();

    match options.store_type {
        Some(StoreType::Memory) => Ok(Arc::new(MemoryStorage::new())),
        Some(StoreType::Redis) => from_redis_client(client),
        Some(StoreType::Memcached) => from_memcached_client(client),
        None => Ok(detect(client)),
    }
} // end fn init_storage

fn detect(client: Option<StoreClient>) -> Arc<dyn Storage> {
    let Some(client) = client else {
        return Arc::new(MemoryStorage::new());
    };

    #[cfg(feature = "redis")]
    let client = match client.downcast::<::redis::aio::ConnectionManager>() {
        Ok(manager) => return Arc::new(RedisStorage::from_connection_manager(manager)),
        Err(client) => client,
    };

    #[cfg(feature = "memcached")]
    let client = match client.downcast::<::memcache::Client>() {
        Ok(mc) => return Arc::new(MemcachedStorage::from_client(mc)),
        Err(client) => client,
    };

    drop(client);
    Arc::new(MemoryStorage::new())
} // end fn detect

#[cfg(feature = "redis")]
fn from_redis_client(client: Option<StoreClient>) -> Result<Arc<dyn Storage>, FragmaError> {
    let Some(client) = client else {
        return Err(FragmaError::InvalidOptions(
            "store type is redis but no store client was provided".to_string(),
        ));
    };

    match client.downcast::<::redis::aio::ConnectionManager>() {
        Ok(manager) => Ok(Arc::new(RedisStorage::from_connection_manager(manager))),
        Err(_) => Err(FragmaError::InvalidOptions(
            "store type is redis but the store client is not a redis connection manager"
                .to_string(),
        )),
    }
}

#[cfg(not(feature = "redis"))]
fn from_redis_client(_client: Option<StoreClient>) -> Result<Arc<dyn Storage>, FragmaError> {
    Err(FragmaError::InvalidOptions(
        "redis support is not enabled; rebuild with the `redis` feature".to_string(),
    ))
}

#[cfg(feature = "memcached")]
fn from_memcached_client(client: Option<StoreClient>) -> Result<Arc<dyn Storage>, FragmaError> {
    let Some(client) = client else {
        return Err(FragmaError::InvalidOptions(
            "store type is memcached but no store client was provided".to_string(),
        ));
    };

    match client.downcast::<::memcache::Client>() {
        Ok(mc) => Ok(Arc::new(MemcachedStorage::from_client(mc))),
        Err(_) => Err(FragmaError::InvalidOptions(
            "store type is memcached but the store client is not a memcache client".to_string(),
        )),
    }
}

#[cfg(not(feature = "memcached"))]
fn from_memcached_client(_client: Option<StoreClient>) -> Result<Arc<dyn Storage>, FragmaError> {
    Err(FragmaError::InvalidOptions(
        "memcached support is not enabled; rebuild with the `memcached` feature".to_string(),
    ))
}
