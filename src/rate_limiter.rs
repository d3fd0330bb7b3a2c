use std::{fmt, sync::Arc, time::Duration};

use crate::{
    FragmaError, Options, RateLimitResult, Strategy,
    storage::{Storage, init_storage},
    strategies::{
        BLOCK_SUFFIX, FixedWindow, LEAKY_BUCKET_SUFFIX, LeakyBucket, SLIDING_WINDOW_SUFFIX,
        SlidingWindow, TOKEN_BUCKET_SUFFIX, TokenBucket,
    },
};

/// A rate limiter enforcing a `(points, duration)` quota per identity key.
///
/// The limiter composes storage keys as `{key_prefix}:{key}` and dispatches
/// each call to the configured algorithm engine. All state lives in the
/// storage backend, so a limiter handle is cheap and safe to share across
/// tasks.
///
/// Per-key ordering guarantees differ by strategy: the fixed window rides on
/// the backend's atomic increment and is exact under contention; the other
/// three engines read, compute and write state back, so two racing consumers
/// can both admit off the same snapshot ("last writer wins") with
/// over-admission bounded by the number of concurrent workers.
pub struct RateLimiter {
    storage: Arc<dyn Storage>,
    opts: Options,
}

impl RateLimiter {
    /// Create a limiter from `options`.
    ///
    /// Validates the quota and fills defaults, then selects a storage
    /// adapter: an explicit `store_type` first, auto-detection on the client
    /// handle's runtime type second, in-memory storage as the fallthrough.
    pub fn new(mut options: Options) -> Result<Self, FragmaError> {
        options.validate()?;
        let storage = init_storage(&mut options)?;

        Ok(Self {
            storage,
            opts: options,
        })
    }

    /// Attempt to consume `cost` points for `key`.
    ///
    /// Returns the decision plus the quantitative state needed to emit
    /// rate-limit headers (see [`RateLimitResult::headers`]). A `cost` of 0
    /// is admitted and consumes nothing. A storage failure means the call
    /// was neither allowed nor denied; the fail-open/fail-closed policy is
    /// the caller's.
    pub async fn consume(&self, key: &str, cost: u64) -> Result<RateLimitResult, FragmaError> {
        let base_key = self.build_key(key);
        let storage = self.storage.as_ref();

        match self.opts.strategy {
            Strategy::TokenBucket => self.token_bucket().consume(storage, &base_key, cost).await,
            Strategy::LeakyBucket => self.leaky_bucket().consume(storage, &base_key, cost).await,
            Strategy::FixedWindow => self.fixed_window().consume(storage, &base_key, cost).await,
            Strategy::SlidingWindow => {
                self.sliding_window().consume(storage, &base_key, cost).await
            }
        }
    } // end method consume

    /// Read the current state for `key` without consuming anything.
    ///
    /// Returns `None` when no state is persisted for the configured strategy
    /// (never consumed, expired, or fully drained/evicted).
    pub async fn get(&self, key: &str) -> Result<Option<RateLimitResult>, FragmaError> {
        let base_key = self.build_key(key);
        let storage = self.storage.as_ref();

        match self.opts.strategy {
            Strategy::TokenBucket => self.token_bucket().peek(storage, &base_key).await,
            Strategy::LeakyBucket => self.leaky_bucket().peek(storage, &base_key).await,
            Strategy::FixedWindow => self.fixed_window().peek(storage, &base_key).await,
            Strategy::SlidingWindow => self.sliding_window().peek(storage, &base_key).await,
        }
    } // end method get

    /// Delete all algorithm state for `key`.
    ///
    /// Removes the base key and every strategy-suffixed record, regardless
    /// of the configured strategy. Missing keys are not errors, so reset is
    /// idempotent.
    pub async fn reset(&self, key: &str) -> Result<(), FragmaError> {
        let base_key = self.build_key(key);

        self.storage.reset(&base_key).await?;
        for suffix in [
            TOKEN_BUCKET_SUFFIX,
            LEAKY_BUCKET_SUFFIX,
            SLIDING_WINDOW_SUFFIX,
        ] {
            self.storage.reset(&format!("{base_key}:{suffix}")).await?;
        }

        Ok(())
    } // end method reset

    /// Force denial for `key` for `block_secs` seconds.
    ///
    /// Writes an override counter far exceeding the budget under
    /// `{base}:block`. A `block_secs` of 0 falls back to the configured
    /// `block_duration_secs`. The override is enforced by the fixed window
    /// engine; the other strategies treat it as advisory.
    pub async fn block(&self, key: &str, block_secs: u64) -> Result<(), FragmaError> {
        let secs = if block_secs == 0 {
            self.opts.block_duration_secs
        } else {
            block_secs
        };
        let block_key = format!("{}:{BLOCK_SUFFIX}", self.build_key(key));

        self.storage
            .increment(&block_key, self.opts.points + 1000, Duration::from_secs(secs))
            .await?;

        Ok(())
    } // end method block

    /// Release storage resources owned by the limiter.
    ///
    /// Idempotent in effect: further operations on this limiter return
    /// storage errors.
    pub async fn close(&self) -> Result<(), FragmaError> {
        self.storage.close().await
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}:{}", self.opts.key_prefix, key)
    }

    fn token_bucket(&self) -> TokenBucket {
        TokenBucket::new(self.opts.points, self.opts.duration_secs)
    }

    fn leaky_bucket(&self) -> LeakyBucket {
        LeakyBucket::new(self.opts.points, self.opts.duration_secs)
    }

    fn sliding_window(&self) -> SlidingWindow {
        SlidingWindow::new(self.opts.points, self.opts.duration_secs)
    }

    fn fixed_window(&self) -> FixedWindow {
        FixedWindow::new(self.opts.points, self.opts.duration_secs)
    }
} // end of impl

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}
