//! Fragma is a general-purpose rate limiting engine.
//!
//! A [`RateLimiter`] enforces a quota of `points` per `duration_secs` for
//! caller-supplied identity keys, using one of four admission algorithms
//! (token bucket, leaky bucket, fixed window, sliding window) over a
//! pluggable storage backend (in-memory, Redis, Memcached).
//!
//! The crate focuses on:
//! - a uniform decision surface rich enough to emit standard rate-limit
//!   HTTP headers
//! - a small storage contract (atomic counters and opaque JSON documents,
//!   both with TTL) that additional backends can implement
//! - concurrency-safe admission from many tasks and, with a remote backend,
//!   many processes
//!
//! This crate is still in development (pre-release); APIs and behavior may
//! change.
//!
//! # Quick start
//!
//! ```
//! use fragma::{Options, RateLimiter, Strategy};
//!
//! # async fn demo() -> Result<(), fragma::FragmaError> {
//! let limiter = RateLimiter::new(Options {
//!     points: 10,
//!     duration_secs: 60,
//!     strategy: Strategy::TokenBucket,
//!     ..Options::default()
//! })?;
//!
//! let decision = limiter.consume("user:123", 1).await?;
//! if decision.allowed {
//!     // proceed
//! } else {
//!     // back off for decision.ms_before_next milliseconds
//! }
//! # Ok(())
//! # }
//! ```
//!
//! To share limits across processes, hand in a client for a remote store:
//!
//! ```no_run
//! use fragma::{Options, RateLimiter, StoreClient};
//!
//! # #[cfg(feature = "redis")]
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = redis::Client::open("redis://127.0.0.1:6379/")?;
//! let manager = client.get_connection_manager().await?;
//!
//! let limiter = RateLimiter::new(Options {
//!     points: 100,
//!     duration_secs: 60,
//!     store_client: Some(StoreClient::new(manager)),
//!     ..Options::default()
//! })?;
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod options;
pub use options::*;

mod result;
pub use result::*;

mod rate_limiter;
pub use rate_limiter::*;

pub mod storage;

mod strategies;

#[cfg(test)]
mod tests;
