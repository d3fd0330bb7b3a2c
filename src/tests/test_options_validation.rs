use std::str::FromStr;

use crate::{FragmaError, Options, RateLimiter, StoreType, Strategy};

#[test]
fn defaults_mirror_the_documented_contract() {
    let opts = Options::default();

    assert_eq!(opts.points, 5);
    assert_eq!(opts.duration_secs, 1);
    assert_eq!(opts.strategy, Strategy::TokenBucket);
    assert_eq!(opts.block_duration_secs, 0);
    assert_eq!(opts.key_prefix, "rl");
    assert!(opts.store_client.is_none());
    assert!(opts.store_type.is_none());
}

#[test]
fn validate_fills_block_duration_and_prefix() {
    let mut opts = Options {
        points: 10,
        duration_secs: 60,
        key_prefix: String::new(),
        ..Options::default()
    };

    opts.validate().unwrap();

    assert_eq!(opts.block_duration_secs, 60);
    assert_eq!(opts.key_prefix, "rl");
}

#[test]
fn validate_keeps_an_explicit_block_duration() {
    let mut opts = Options {
        points: 10,
        duration_secs: 60,
        block_duration_secs: 300,
        ..Options::default()
    };

    opts.validate().unwrap();

    assert_eq!(opts.block_duration_secs, 300);
}

#[test]
fn new_rejects_zero_points() {
    let err = RateLimiter::new(Options {
        points: 0,
        ..Options::default()
    })
    .unwrap_err();

    assert!(matches!(err, FragmaError::InvalidOptions(_)));
}

#[test]
fn new_rejects_zero_duration() {
    let err = RateLimiter::new(Options {
        duration_secs: 0,
        ..Options::default()
    })
    .unwrap_err();

    assert!(matches!(err, FragmaError::InvalidOptions(_)));
}

#[test]
fn strategy_parses_its_wire_names() {
    assert_eq!(
        Strategy::from_str("token_bucket").unwrap(),
        Strategy::TokenBucket
    );
    assert_eq!(
        Strategy::from_str("leaky_bucket").unwrap(),
        Strategy::LeakyBucket
    );
    assert_eq!(
        Strategy::from_str("fixed_window").unwrap(),
        Strategy::FixedWindow
    );
    assert_eq!(
        Strategy::from_str("sliding_window").unwrap(),
        Strategy::SlidingWindow
    );

    assert!(matches!(
        Strategy::from_str("galloping_window"),
        Err(FragmaError::UnknownStrategy(_))
    ));
}

#[test]
fn strategy_displays_its_wire_names() {
    assert_eq!(Strategy::TokenBucket.to_string(), "token_bucket");
    assert_eq!(Strategy::SlidingWindow.to_string(), "sliding_window");
}

#[test]
fn store_type_parses_known_backends() {
    assert_eq!(StoreType::from_str("memory").unwrap(), StoreType::Memory);
    assert_eq!(StoreType::from_str("redis").unwrap(), StoreType::Redis);
    assert_eq!(
        StoreType::from_str("memcached").unwrap(),
        StoreType::Memcached
    );

    assert!(matches!(
        StoreType::from_str("etcd"),
        Err(FragmaError::UnknownStoreType(_))
    ));
}

#[test]
fn default_strategy_is_token_bucket() {
    assert_eq!(Strategy::default(), Strategy::TokenBucket);
}
