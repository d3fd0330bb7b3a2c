use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    FragmaError, RateLimitResult,
    storage::Storage,
    strategies::{TOKEN_BUCKET_SUFFIX, load_state, store_state, unix_ms},
};

/// Persisted token bucket state (`{base}:tb`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenBucketState {
    tokens: f64,
    last_refill: u64,
    capacity: u64,
    refill_rate: f64,
}

/// Token bucket engine.
///
/// A bucket of `points` tokens refills continuously at `points / duration`
/// tokens per second. A consume succeeds iff the refilled bucket holds at
/// least `cost` tokens. Denials are not persisted, so the refill stays
/// observable on the next call.
///
/// A cost above the capacity can never succeed; the reported wait time
/// still assumes continuous refill.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TokenBucket {
    points: u64,
    duration_secs: u64,
}

impl TokenBucket {
    pub fn new(points: u64, duration_secs: u64) -> Self {
        Self {
            points,
            duration_secs,
        }
    }

    fn refill_rate(&self) -> f64 {
        self.points as f64 / self.duration_secs as f64
    }

    fn state_key(&self, base_key: &str) -> String {
        format!("{base_key}:{TOKEN_BUCKET_SUFFIX}")
    }

    fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.duration_secs * 2)
    }

    fn fresh_state(&self, now_ms: u64) -> TokenBucketState {
        TokenBucketState {
            tokens: self.points as f64,
            last_refill: now_ms,
            capacity: self.points,
            refill_rate: self.refill_rate(),
        }
    }

    /// Advance `state` to `now_ms` and return the elapsed seconds.
    fn refill(&self, state: &mut TokenBucketState, now_ms: u64) -> f64 {
        let elapsed_secs = now_ms.saturating_sub(state.last_refill) as f64 / 1000.0;
        state.tokens =
            (state.tokens + elapsed_secs * state.refill_rate).min(state.capacity as f64);
        state.last_refill = now_ms;
        elapsed_secs
    }

    pub async fn consume(
        &self,
        storage: &dyn Storage,
        base_key: &str,
        cost: u64,
    ) -> Result<RateLimitResult, FragmaError> {
        let now_ms = unix_ms();
        let state_key = self.state_key(base_key);

        let mut state = load_state::<TokenBucketState>(storage, &state_key)
            .await?
            .unwrap_or_else(|| self.fresh_state(now_ms));

        let elapsed_secs = self.refill(&mut state, now_ms);

        if state.tokens >= cost as f64 {
            state.tokens -= cost as f64;
            store_state(storage, &state_key, &state, self.state_ttl()).await?;

            return Ok(RateLimitResult {
                ms_before_next: 0,
                remaining_points: state.tokens as u64,
                consumed_points: cost,
                is_first_in_duration: elapsed_secs > self.duration_secs as f64,
                total_hits: self.points,
                allowed: true,
            });
        }

        let missing = cost as f64 - state.tokens;
        let ms_before_next = (missing / state.refill_rate * 1000.0).ceil() as u64;

        Ok(RateLimitResult {
            ms_before_next,
            remaining_points: state.tokens as u64,
            consumed_points: 0,
            is_first_in_duration: false,
            total_hits: self.points,
            allowed: false,
        })
    } // end method consume

    /// Non-mutating snapshot; `None` when no bucket state is stored.
    pub async fn peek(
        &self,
        storage: &dyn Storage,
        base_key: &str,
    ) -> Result<Option<RateLimitResult>, FragmaError> {
        let now_ms = unix_ms();
        let state_key = self.state_key(base_key);

        let Some(mut state) = load_state::<TokenBucketState>(storage, &state_key).await? else {
            return Ok(None);
        };

        self.refill(&mut state, now_ms);

        let allowed = state.tokens >= 1.0;
        let ms_before_next = if allowed {
            0
        } else {
            ((1.0 - state.tokens) / state.refill_rate * 1000.0).ceil() as u64
        };

        Ok(Some(RateLimitResult {
            ms_before_next,
            remaining_points: state.tokens as u64,
            consumed_points: self.points.saturating_sub(state.tokens as u64),
            is_first_in_duration: false,
            total_hits: self.points,
            allowed,
        }))
    } // end method peek
}
