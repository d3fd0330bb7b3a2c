use std::time::Duration;

use crate::{
    FragmaError, RateLimitResult,
    storage::Storage,
    strategies::{BLOCK_SUFFIX, unix_ms},
};

/// Fixed window engine.
///
/// Admissions are counted per epoch-anchored window `[k·D, (k+1)·D)` under
/// the key `{base}:{window_start_unix}`, so a counter left over from one
/// window can never alias the next. This is the only engine whose state is
/// the atomic counter primitive, and the only one that honors the `:block`
/// override written by [`block`](crate::RateLimiter::block).
///
/// Admission is a guarded atomic increment: a read denies obvious overflow
/// without touching the counter, and the increment's returned count is
/// re-checked so that concurrent racers are admitted exactly up to `points`.
/// A denial that loses such a race leaves its increment in the counter for
/// the remainder of the window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedWindow {
    points: u64,
    duration_secs: u64,
}

impl FixedWindow {
    pub fn new(points: u64, duration_secs: u64) -> Self {
        Self {
            points,
            duration_secs,
        }
    }

    fn window_start_secs(&self, now_ms: u64) -> u64 {
        (now_ms / 1000) / self.duration_secs * self.duration_secs
    }

    fn window_key(&self, base_key: &str, window_start_secs: u64) -> String {
        format!("{base_key}:{window_start_secs}")
    }

    fn block_key(&self, base_key: &str) -> String {
        format!("{base_key}:{BLOCK_SUFFIX}")
    }

    /// Time until the current window rolls over, reported on every outcome.
    fn ms_until_boundary(&self, now_ms: u64, window_start_secs: u64) -> u64 {
        ((window_start_secs + self.duration_secs) * 1000).saturating_sub(now_ms)
    }

    pub async fn consume(
        &self,
        storage: &dyn Storage,
        base_key: &str,
        cost: u64,
    ) -> Result<RateLimitResult, FragmaError> {
        let now_ms = unix_ms();
        let window_start = self.window_start_secs(now_ms);
        let ms_before_next = self.ms_until_boundary(now_ms, window_start);

        if storage.get(&self.block_key(base_key)).await? > 0 {
            return Ok(RateLimitResult {
                ms_before_next,
                remaining_points: 0,
                consumed_points: self.points,
                is_first_in_duration: false,
                total_hits: self.points,
                allowed: false,
            });
        }

        let window_key = self.window_key(base_key, window_start);
        let current = storage.get(&window_key).await?;
        let is_first_in_duration = current == 0;

        if current.saturating_add(cost) > self.points {
            return Ok(RateLimitResult {
                ms_before_next,
                remaining_points: self.points.saturating_sub(current),
                consumed_points: current.min(self.points),
                is_first_in_duration,
                total_hits: self.points,
                allowed: false,
            });
        }

        let new_count = storage
            .increment(&window_key, cost, Duration::from_secs(self.duration_secs))
            .await?;

        if new_count > self.points {
            // Lost a race with a concurrent consumer; the increment stands
            // but this call is denied.
            let observed = new_count - cost;
            return Ok(RateLimitResult {
                ms_before_next,
                remaining_points: self.points.saturating_sub(observed),
                consumed_points: observed.min(self.points),
                is_first_in_duration,
                total_hits: self.points,
                allowed: false,
            });
        }

        Ok(RateLimitResult {
            ms_before_next,
            remaining_points: self.points - new_count,
            consumed_points: new_count,
            is_first_in_duration,
            total_hits: self.points,
            allowed: true,
        })
    } // end method consume

    /// Non-mutating snapshot; `None` when the current window has no counter.
    ///
    /// Consults the block override the same way `consume` does, so a peek
    /// never reports headroom that the next consume would deny.
    pub async fn peek(
        &self,
        storage: &dyn Storage,
        base_key: &str,
    ) -> Result<Option<RateLimitResult>, FragmaError> {
        let now_ms = unix_ms();
        let window_start = self.window_start_secs(now_ms);

        if storage.get(&self.block_key(base_key)).await? > 0 {
            return Ok(Some(RateLimitResult {
                ms_before_next: self.ms_until_boundary(now_ms, window_start),
                remaining_points: 0,
                consumed_points: self.points,
                is_first_in_duration: false,
                total_hits: self.points,
                allowed: false,
            }));
        }

        let current = storage
            .get(&self.window_key(base_key, window_start))
            .await?;
        if current == 0 {
            return Ok(None);
        }

        Ok(Some(RateLimitResult {
            ms_before_next: self.ms_until_boundary(now_ms, window_start),
            remaining_points: self.points.saturating_sub(current),
            consumed_points: current.min(self.points),
            is_first_in_duration: false,
            total_hits: self.points,
            allowed: current < self.points,
        }))
    } // end method peek
}
