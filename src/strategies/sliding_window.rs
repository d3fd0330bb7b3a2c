use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    FragmaError, RateLimitResult,
    storage::Storage,
    strategies::{SLIDING_WINDOW_SUFFIX, load_state, store_state, unix_ms},
};

/// Persisted sliding window state (`{base}:sw`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SlidingWindowState {
    requests: Vec<u64>,
}

/// Sliding window engine.
///
/// At any instant, the admissions recorded in the trailing `duration`
/// interval may not exceed `points`. Each admitted point is one recorded
/// timestamp, so the sequence is bounded by `points` at steady state
/// (eviction runs before admission).
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlidingWindow {
    points: u64,
    duration_secs: u64,
}

impl SlidingWindow {
    pub fn new(points: u64, duration_secs: u64) -> Self {
        Self {
            points,
            duration_secs,
        }
    }

    fn state_key(&self, base_key: &str) -> String {
        format!("{base_key}:{SLIDING_WINDOW_SUFFIX}")
    }

    fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.duration_secs * 2)
    }

    fn duration_ms(&self) -> u64 {
        self.duration_secs * 1000
    }

    /// Drop timestamps at or before the trailing window boundary.
    fn evict(&self, state: &mut SlidingWindowState, now_ms: u64) {
        let window_start = now_ms.saturating_sub(self.duration_ms());
        state.requests.retain(|&ts| ts > window_start);
    }

    pub async fn consume(
        &self,
        storage: &dyn Storage,
        base_key: &str,
        cost: u64,
    ) -> Result<RateLimitResult, FragmaError> {
        let now_ms = unix_ms();
        let state_key = self.state_key(base_key);

        let mut state = load_state::<SlidingWindowState>(storage, &state_key)
            .await?
            .unwrap_or(SlidingWindowState {
                requests: Vec::new(),
            });

        self.evict(&mut state, now_ms);
        let len = state.requests.len() as u64;

        if len.saturating_add(cost) <= self.points {
            for _ in 0..cost {
                state.requests.push(now_ms);
            }
            store_state(storage, &state_key, &state, self.state_ttl()).await?;

            return Ok(RateLimitResult {
                ms_before_next: 0,
                remaining_points: self.points - (len + cost),
                consumed_points: len + cost,
                is_first_in_duration: len == 0,
                total_hits: self.points,
                allowed: true,
            });
        }

        // Denials are not persisted; the eviction stays observable on the next call.
        match state.requests.first() {
            Some(&oldest) => Ok(RateLimitResult {
                ms_before_next: (oldest + self.duration_ms()).saturating_sub(now_ms),
                remaining_points: self.points.saturating_sub(len),
                consumed_points: len,
                is_first_in_duration: false,
                total_hits: self.points,
                allowed: false,
            }),
            // Only reachable when a single cost exceeds the whole budget.
            None => Ok(RateLimitResult {
                ms_before_next: 0,
                remaining_points: self.points,
                consumed_points: 0,
                is_first_in_duration: false,
                total_hits: self.points,
                allowed: false,
            }),
        }
    } // end method consume

    /// Non-mutating snapshot; `None` when no timestamp survives eviction.
    pub async fn peek(
        &self,
        storage: &dyn Storage,
        base_key: &str,
    ) -> Result<Option<RateLimitResult>, FragmaError> {
        let now_ms = unix_ms();
        let state_key = self.state_key(base_key);

        let Some(mut state) = load_state::<SlidingWindowState>(storage, &state_key).await? else {
            return Ok(None);
        };

        self.evict(&mut state, now_ms);
        if state.requests.is_empty() {
            return Ok(None);
        }

        let len = state.requests.len() as u64;
        let allowed = len < self.points;
        let ms_before_next = if allowed {
            0
        } else {
            state
                .requests
                .first()
                .map(|&oldest| (oldest + self.duration_ms()).saturating_sub(now_ms))
                .unwrap_or(0)
        };

        Ok(Some(RateLimitResult {
            ms_before_next,
            remaining_points: self.points.saturating_sub(len),
            consumed_points: len.min(self.points),
            is_first_in_duration: false,
            total_hits: self.points,
            allowed,
        }))
    } // end method peek
}
