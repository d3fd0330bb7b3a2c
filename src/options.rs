use std::{any::Any, fmt, str::FromStr};

use crate::FragmaError;

/// The rate limiting algorithm enforced by a [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Classic token bucket: continuous refill at `points / duration` per second.
    #[default]
    TokenBucket,
    /// Leaky bucket: a FIFO queue draining at `points / duration` per second.
    LeakyBucket,
    /// Fixed window: an epoch-anchored counter that resets at each boundary.
    FixedWindow,
    /// Sliding window: admissions counted over the trailing `duration` interval.
    SlidingWindow,
}

impl Strategy {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Strategy::TokenBucket => "token_bucket",
            Strategy::LeakyBucket => "leaky_bucket",
            Strategy::FixedWindow => "fixed_window",
            Strategy::SlidingWindow => "sliding_window",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = FragmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token_bucket" => Ok(Strategy::TokenBucket),
            "leaky_bucket" => Ok(Strategy::LeakyBucket),
            "fixed_window" => Ok(Strategy::FixedWindow),
            "sliding_window" => Ok(Strategy::SlidingWindow),
            other => Err(FragmaError::UnknownStrategy(other.to_string())),
        }
    }
}

/// The storage backend a [`RateLimiter`](crate::RateLimiter) keeps its state in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Process-local storage; state is not shared and dies with the process.
    Memory,
    /// A Redis server reached through a caller-supplied connection manager.
    Redis,
    /// A Memcached server reached through a caller-supplied client.
    Memcached,
}

impl StoreType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            StoreType::Memory => "memory",
            StoreType::Redis => "redis",
            StoreType::Memcached => "memcached",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = FragmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StoreType::Memory),
            "redis" => Ok(StoreType::Redis),
            "memcached" => Ok(StoreType::Memcached),
            other => Err(FragmaError::UnknownStoreType(other.to_string())),
        }
    }
}

/// A type-erased handle to an external storage client.
///
/// The engine inspects the handle's runtime type to pick an adapter:
/// a `redis::aio::ConnectionManager` routes to the Redis adapter and a
/// `memcache::Client` to the Memcached adapter. Anything else falls through
/// to in-memory storage.
pub struct StoreClient {
    inner: Box<dyn Any + Send + Sync>,
}

impl StoreClient {
    /// Wrap an owned client handle.
    pub fn new<C>(client: C) -> Self
    where
        C: Any + Send + Sync,
    {
        Self {
            inner: Box::new(client),
        }
    }

    pub(crate) fn downcast<C: Any>(self) -> Result<C, Self> {
        match self.inner.downcast::<C>() {
            Ok(client) => Ok(*client),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient").finish_non_exhaustive()
    }
}

/// Configuration for a [`RateLimiter`](crate::RateLimiter).
///
/// The quota is `points` per `duration_secs`. Construct with struct-update
/// syntax over [`Options::default`]:
///
/// ```
/// use fragma::{Options, Strategy};
///
/// let opts = Options {
///     points: 100,
///     duration_secs: 60,
///     strategy: Strategy::SlidingWindow,
///     ..Options::default()
/// };
/// ```
#[derive(Debug)]
pub struct Options {
    /// Maximum points that can be consumed per `duration_secs`. Must be positive.
    pub points: u64,
    /// Window length in seconds. Must be positive.
    pub duration_secs: u64,
    /// The admission algorithm.
    pub strategy: Strategy,
    /// Duration used by [`block`](crate::RateLimiter::block) when the caller
    /// passes 0. Defaults to `duration_secs` when left at 0.
    pub block_duration_secs: u64,
    /// Prefix composed into every storage key. Defaults to `"rl"`.
    pub key_prefix: String,
    /// External storage client, if any. `None` means in-memory storage.
    pub store_client: Option<StoreClient>,
    /// Explicit backend selection; takes precedence over auto-detection.
    pub store_type: Option<StoreType>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            points: 5,
            duration_secs: 1,
            strategy: Strategy::default(),
            block_duration_secs: 0,
            key_prefix: "rl".to_string(),
            store_client: None,
            store_type: None,
        }
    }
}

impl Options {
    /// Check invariants and fill defaults in place.
    pub(crate) fn validate(&mut self) -> Result<(), FragmaError> {
        if self.points == 0 {
            return Err(FragmaError::InvalidOptions(
                "points must be greater than 0".to_string(),
            ));
        }

        if self.duration_secs == 0 {
            return Err(FragmaError::InvalidOptions(
                "duration must be greater than 0".to_string(),
            ));
        }

        if self.block_duration_secs == 0 {
            self.block_duration_secs = self.duration_secs;
        }

        if self.key_prefix.is_empty() {
            self.key_prefix = "rl".to_string();
        }

        Ok(())
    } // end method validate
}
