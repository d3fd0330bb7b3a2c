/// Error type for this crate.
///
/// Configuration problems are surfaced from [`RateLimiter::new`](crate::RateLimiter::new)
/// and the `FromStr` parsers and are never worth retrying. Storage variants
/// carry whatever the backend reported; the engine does not retry on the
/// caller's behalf, and a consume that fails with a storage error is neither
/// allowed nor denied.
#[derive(Debug, thiserror::Error)]
pub enum FragmaError {
    /// Invalid configuration passed to [`RateLimiter::new`](crate::RateLimiter::new).
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A strategy name that is not one of the four known algorithms.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// A store type name that is not `memory`, `redis` or `memcached`.
    #[error("unknown store type: {0}")]
    UnknownStoreType(String),

    /// The storage adapter was closed; the limiter can no longer be used.
    #[error("storage is closed")]
    StorageClosed,

    /// Persisted algorithm state could not be encoded or decoded.
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis error.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Memcached error.
    #[cfg(feature = "memcached")]
    #[error("memcached error: {0}")]
    Memcached(#[from] memcache::MemcacheError),

    /// Any other storage failure without a dedicated source type.
    #[error("storage error: {0}")]
    Storage(String),
}
