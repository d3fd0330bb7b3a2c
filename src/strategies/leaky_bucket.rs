use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    FragmaError, RateLimitResult,
    storage::Storage,
    strategies::{LEAKY_BUCKET_SUFFIX, load_state, store_state, unix_ms},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QueuedRequest {
    timestamp: u64,
    points: u64,
}

/// Persisted leaky bucket state (`{base}:lb`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LeakyBucketState {
    queue: Vec<QueuedRequest>,
    last_drain: u64,
    drain_rate: f64,
}

impl LeakyBucketState {
    fn queued_points(&self) -> u64 {
        self.queue.iter().map(|item| item.points).sum()
    }
}

/// Leaky bucket engine.
///
/// Requests join a FIFO queue whose total point-mass may not exceed
/// `points`; the queue drains at `points / duration` point-units per second.
/// A head item caught mid-drain is dropped entirely, forfeiting its
/// remaining points.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeakyBucket {
    points: u64,
    duration_secs: u64,
}

impl LeakyBucket {
    pub fn new(points: u64, duration_secs: u64) -> Self {
        Self {
            points,
            duration_secs,
        }
    }

    fn drain_rate(&self) -> f64 {
        self.points as f64 / self.duration_secs as f64
    }

    fn state_key(&self, base_key: &str) -> String {
        format!("{base_key}:{LEAKY_BUCKET_SUFFIX}")
    }

    fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.duration_secs * 2)
    }

    fn fresh_state(&self, now_ms: u64) -> LeakyBucketState {
        LeakyBucketState {
            queue: Vec::new(),
            last_drain: now_ms,
            drain_rate: self.drain_rate(),
        }
    }

    /// Drop head items covering the point-units drained since `last_drain`.
    fn drain(&self, state: &mut LeakyBucketState, now_ms: u64) {
        let elapsed_secs = now_ms.saturating_sub(state.last_drain) as f64 / 1000.0;
        let to_drain = (elapsed_secs * state.drain_rate) as u64;

        let mut drained = 0u64;
        let mut keep_from = 0usize;
        for (index, item) in state.queue.iter().enumerate() {
            if drained >= to_drain {
                break;
            }
            drained += item.points;
            keep_from = index + 1;
        }

        state.queue.drain(..keep_from);
        state.last_drain = now_ms;
    } // end method drain

    pub async fn consume(
        &self,
        storage: &dyn Storage,
        base_key: &str,
        cost: u64,
    ) -> Result<RateLimitResult, FragmaError> {
        let now_ms = unix_ms();
        let state_key = self.state_key(base_key);

        let mut state = load_state::<LeakyBucketState>(storage, &state_key)
            .await?
            .unwrap_or_else(|| self.fresh_state(now_ms));

        self.drain(&mut state, now_ms);
        let current = state.queued_points();

        if current.saturating_add(cost) <= self.points {
            state.queue.push(QueuedRequest {
                timestamp: now_ms,
                points: cost,
            });
            store_state(storage, &state_key, &state, self.state_ttl()).await?;

            return Ok(RateLimitResult {
                ms_before_next: 0,
                remaining_points: self.points - (current + cost),
                consumed_points: current + cost,
                is_first_in_duration: state.queue.len() == 1,
                total_hits: self.points,
                allowed: true,
            });
        }

        // Denials are not persisted; the drain stays observable on the next call.
        let overflow = current.saturating_add(cost) - self.points;
        let ms_before_next = (overflow as f64 / state.drain_rate * 1000.0).ceil() as u64;

        Ok(RateLimitResult {
            ms_before_next,
            remaining_points: self.points.saturating_sub(current),
            consumed_points: current,
            is_first_in_duration: false,
            total_hits: self.points,
            allowed: false,
        })
    } // end method consume

    /// Non-mutating snapshot; `None` when the queue is absent or fully drained.
    pub async fn peek(
        &self,
        storage: &dyn Storage,
        base_key: &str,
    ) -> Result<Option<RateLimitResult>, FragmaError> {
        let now_ms = unix_ms();
        let state_key = self.state_key(base_key);

        let Some(mut state) = load_state::<LeakyBucketState>(storage, &state_key).await? else {
            return Ok(None);
        };

        self.drain(&mut state, now_ms);
        if state.queue.is_empty() {
            return Ok(None);
        }

        let current = state.queued_points();
        let allowed = current < self.points;
        let ms_before_next = if allowed {
            0
        } else {
            let overflow = (current + 1) - self.points;
            (overflow as f64 / state.drain_rate * 1000.0).ceil() as u64
        };

        Ok(Some(RateLimitResult {
            ms_before_next,
            remaining_points: self.points.saturating_sub(current),
            consumed_points: current.min(self.points),
            is_first_in_duration: false,
            total_hits: self.points,
            allowed,
        }))
    } // end method peek
}
