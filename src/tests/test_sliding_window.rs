use std::time::Duration;

use crate::{Options, RateLimiter, Strategy};

fn limiter(points: u64, duration_secs: u64) -> RateLimiter {
    RateLimiter::new(Options {
        points,
        duration_secs,
        strategy: Strategy::SlidingWindow,
        ..Options::default()
    })
    .unwrap()
}

#[tokio::test]
async fn budget_plus_one_produces_exactly_one_denial() {
    let rl = limiter(3, 2);

    for i in 1..=3u64 {
        let result = rl.consume("k", 1).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.consumed_points, i);
        assert_eq!(result.remaining_points, 3 - i);
    }

    let denied = rl.consume("k", 1).await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.consumed_points, 3);
    assert_eq!(denied.remaining_points, 0);
    // The oldest admission was moments ago; the wait is nearly the window.
    assert!(denied.ms_before_next > 1800);
    assert!(denied.ms_before_next <= 2000);
}

#[tokio::test]
async fn window_fully_restores_after_the_duration() {
    let rl = limiter(3, 2);

    for _ in 0..3 {
        assert!(rl.consume("k", 1).await.unwrap().allowed);
    }
    assert!(!rl.consume("k", 1).await.unwrap().allowed);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let result = rl.consume("k", 1).await.unwrap();
    assert!(result.allowed);
    assert_eq!(result.consumed_points, 1);
    assert!(result.is_first_in_duration);
}

#[tokio::test]
async fn multi_point_cost_records_one_timestamp_per_point() {
    let rl = limiter(2, 2);

    let first = rl.consume("k", 2).await.unwrap();
    assert!(first.allowed);
    assert_eq!(first.consumed_points, 2);
    assert!(first.is_first_in_duration);

    let denied = rl.consume("k", 1).await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.consumed_points, 2);
}

#[tokio::test]
async fn old_admissions_slide_out_of_the_window() {
    let rl = limiter(2, 2);

    assert!(rl.consume("k", 2).await.unwrap().allowed);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let denied = rl.consume("k", 2).await.unwrap();
    assert!(!denied.allowed);
    // The oldest admission exits the window in roughly 800 ms.
    assert!(denied.ms_before_next <= 900);

    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert!(rl.consume("k", 2).await.unwrap().allowed);
}

#[tokio::test]
async fn cost_exceeding_the_whole_budget_is_denied_without_state() {
    let rl = limiter(2, 2);

    let denied = rl.consume("k", 3).await.unwrap();

    assert!(!denied.allowed);
    assert_eq!(denied.consumed_points, 0);
    assert_eq!(denied.remaining_points, 2);

    // Nothing was recorded, so the budget itself is still consumable.
    assert!(rl.consume("k", 2).await.unwrap().allowed);
}

#[tokio::test]
async fn denial_wait_shrinks_as_the_clock_advances() {
    let rl = limiter(2, 2);

    assert!(rl.consume("k", 2).await.unwrap().allowed);

    let first = rl.consume("k", 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let second = rl.consume("k", 1).await.unwrap();

    assert!(!first.allowed);
    assert!(!second.allowed);
    assert!(second.ms_before_next < first.ms_before_next);
}
