use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{Options, RateLimiter, Strategy};

fn limiter(points: u64, duration_secs: u64) -> RateLimiter {
    RateLimiter::new(Options {
        points,
        duration_secs,
        strategy: Strategy::FixedWindow,
        ..Options::default()
    })
    .unwrap()
}

/// Sleep past an imminent window boundary so a burst of calls lands inside a
/// single window.
async fn settle_into_window(duration_secs: u64) {
    let window_ms = duration_secs * 1000;
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    let remaining = window_ms - (now_ms % window_ms);

    if remaining < 1500 {
        tokio::time::sleep(Duration::from_millis(remaining + 20)).await;
    }
}

#[tokio::test]
async fn sequential_burst_matches_the_documented_sequence() {
    settle_into_window(10).await;
    let rl = limiter(5, 10);

    for expected_remaining in (0..5).rev() {
        let result = rl.consume("k", 1).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.remaining_points, expected_remaining);
        assert_eq!(result.consumed_points, 5 - expected_remaining);
        assert!(result.ms_before_next <= 10_000);
    }

    let sixth = rl.consume("k", 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let seventh = rl.consume("k", 1).await.unwrap();

    assert!(!sixth.allowed);
    assert!(!seventh.allowed);
    assert_eq!(sixth.consumed_points, 5);
    assert_eq!(sixth.remaining_points, 0);
    assert!(sixth.ms_before_next <= 10_000);
    assert!(seventh.ms_before_next < sixth.ms_before_next);
}

#[tokio::test]
async fn only_the_first_call_in_a_window_is_first() {
    settle_into_window(10).await;
    let rl = limiter(5, 10);

    assert!(rl.consume("k", 1).await.unwrap().is_first_in_duration);
    assert!(!rl.consume("k", 1).await.unwrap().is_first_in_duration);
}

#[tokio::test]
async fn ms_before_next_tracks_the_window_boundary_on_every_outcome() {
    settle_into_window(10).await;
    let rl = limiter(1, 10);

    let allowed = rl.consume("k", 1).await.unwrap();
    let denied = rl.consume("k", 1).await.unwrap();

    assert!(allowed.allowed);
    assert!(allowed.ms_before_next > 0);
    assert!(allowed.ms_before_next <= 10_000);
    assert!(!denied.allowed);
    assert!(denied.ms_before_next > 0);
    assert!(denied.ms_before_next <= allowed.ms_before_next);
}

#[tokio::test]
async fn counter_resets_at_the_window_boundary() {
    settle_into_window(1).await;
    let rl = limiter(2, 1);

    assert!(rl.consume("k", 2).await.unwrap().allowed);
    let denied = rl.consume("k", 1).await.unwrap();
    assert!(!denied.allowed);

    tokio::time::sleep(Duration::from_millis(denied.ms_before_next + 50)).await;

    let result = rl.consume("k", 1).await.unwrap();
    assert!(result.allowed);
    assert!(result.is_first_in_duration);
}

#[tokio::test]
async fn sequential_denials_do_not_inflate_the_counter() {
    settle_into_window(10).await;
    let rl = limiter(3, 10);

    assert!(rl.consume("k", 3).await.unwrap().allowed);
    for _ in 0..4 {
        assert!(!rl.consume("k", 1).await.unwrap().allowed);
    }

    let snapshot = rl.get("k").await.unwrap().unwrap();
    assert_eq!(snapshot.consumed_points, 3);
}

#[tokio::test]
async fn a_large_denied_cost_does_not_eat_the_budget() {
    settle_into_window(10).await;
    let rl = limiter(5, 10);

    assert!(rl.consume("k", 4).await.unwrap().allowed);
    assert!(!rl.consume("k", 3).await.unwrap().allowed);

    // The denied call above must not have consumed anything.
    let result = rl.consume("k", 1).await.unwrap();
    assert!(result.allowed);
    assert_eq!(result.remaining_points, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_are_admitted_exactly_up_to_the_budget() {
    let rl = Arc::new(limiter(50, 3600));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let rl = Arc::clone(&rl);
        handles.push(tokio::spawn(
            async move { rl.consume("k", 1).await.unwrap() },
        ));
    }

    let mut allowed = 0;
    let mut denied = 0;
    for handle in handles {
        if handle.await.unwrap().allowed {
            allowed += 1;
        } else {
            denied += 1;
        }
    }

    assert_eq!(allowed, 50);
    assert_eq!(denied, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_wide_budget_admits_every_concurrent_consumer() {
    let rl = Arc::new(limiter(1000, 3600));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let rl = Arc::clone(&rl);
        handles.push(tokio::spawn(
            async move { rl.consume("k", 1).await.unwrap() },
        ));
    }

    for handle in handles {
        assert!(handle.await.unwrap().allowed);
    }
}
