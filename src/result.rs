use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

/// The outcome of a [`consume`](crate::RateLimiter::consume) or
/// [`get`](crate::RateLimiter::get) call.
///
/// Carries enough quantitative state to emit the conventional rate-limit
/// HTTP headers; see [`RateLimitResult::headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Milliseconds before the next point can be admitted. 0 when the call
    /// was allowed, except under Fixed Window where it is the time until the
    /// window boundary regardless of outcome.
    pub ms_before_next: u64,
    /// Points still available in the current duration.
    pub remaining_points: u64,
    /// Points consumed in the current duration.
    pub consumed_points: u64,
    /// Whether this call was the first admission in the current duration.
    pub is_first_in_duration: bool,
    /// The configured budget (`options.points`).
    pub total_hits: u64,
    /// Whether the call was admitted.
    pub allowed: bool,
}

impl RateLimitResult {
    /// Project the result into the conventional rate-limit response headers.
    ///
    /// `Retry-After` is included only on denial.
    pub fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        let reset_in_secs = self.ms_before_next.div_ceil(1000);
        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        headers.insert("X-RateLimit-Limit".to_string(), self.total_hits.to_string());
        headers.insert(
            "X-RateLimit-Remaining".to_string(),
            self.remaining_points.to_string(),
        );
        headers.insert(
            "X-RateLimit-Reset".to_string(),
            (now_unix + reset_in_secs).to_string(),
        );

        if !self.allowed {
            headers.insert("Retry-After".to_string(), reset_in_secs.to_string());
        }

        headers
    } // end method headers
}
