//! The four admission-control engines.
//!
//! Each engine owns a disjoint storage-key suffix, so a base key can hold a
//! stale record of another strategy without aliasing. Token, leaky and
//! sliding state travels as JSON documents (snake_case fields, unix
//! millisecond timestamps) that every instance sharing a store must agree
//! on; the fixed window uses the atomic counter primitive directly.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, de::DeserializeOwned};

use crate::{FragmaError, storage::Storage};

mod token_bucket;
pub(crate) use token_bucket::*;

mod leaky_bucket;
pub(crate) use leaky_bucket::*;

mod sliding_window;
pub(crate) use sliding_window::*;

mod fixed_window;
pub(crate) use fixed_window::*;

pub(crate) const TOKEN_BUCKET_SUFFIX: &str = "tb";
pub(crate) const LEAKY_BUCKET_SUFFIX: &str = "lb";
pub(crate) const SLIDING_WINDOW_SUFFIX: &str = "sw";
pub(crate) const BLOCK_SUFFIX: &str = "block";

/// Current wall-clock time as unix epoch milliseconds.
pub(crate) fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Load an engine's persisted state, or `None` when the key is absent.
pub(crate) async fn load_state<T>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, FragmaError>
where
    T: DeserializeOwned,
{
    match storage.get_json(key).await? {
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        None => Ok(None),
    }
}

/// Persist an engine's state with the given TTL.
pub(crate) async fn store_state<T>(
    storage: &dyn Storage,
    key: &str,
    state: &T,
    ttl: Duration,
) -> Result<(), FragmaError>
where
    T: Serialize,
{
    let raw = serde_json::to_vec(state)?;
    storage.set_json(key, &raw, ttl).await
}
