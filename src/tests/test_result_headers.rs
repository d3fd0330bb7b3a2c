use std::time::{SystemTime, UNIX_EPOCH};

use crate::RateLimitResult;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[test]
fn allowed_result_omits_retry_after() {
    let result = RateLimitResult {
        ms_before_next: 0,
        remaining_points: 7,
        consumed_points: 3,
        is_first_in_duration: false,
        total_hits: 10,
        allowed: true,
    };

    let headers = result.headers();

    assert_eq!(headers.get("X-RateLimit-Limit").unwrap(), "10");
    assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "7");
    assert!(headers.contains_key("X-RateLimit-Reset"));
    assert!(!headers.contains_key("Retry-After"));
}

#[test]
fn denied_result_includes_ceiled_retry_after() {
    let result = RateLimitResult {
        ms_before_next: 1500,
        remaining_points: 0,
        consumed_points: 10,
        is_first_in_duration: false,
        total_hits: 10,
        allowed: false,
    };

    let headers = result.headers();

    // 1500 ms rounds up to 2 whole seconds.
    assert_eq!(headers.get("Retry-After").unwrap(), "2");

    let reset: u64 = headers.get("X-RateLimit-Reset").unwrap().parse().unwrap();
    let expected = now_unix() + 2;
    assert!(reset >= expected - 1 && reset <= expected + 1);
}

#[test]
fn denial_at_exact_second_boundary_does_not_round_up_twice() {
    let result = RateLimitResult {
        ms_before_next: 3000,
        remaining_points: 0,
        consumed_points: 5,
        is_first_in_duration: false,
        total_hits: 5,
        allowed: false,
    };

    assert_eq!(result.headers().get("Retry-After").unwrap(), "3");
}
