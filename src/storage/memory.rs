use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;

use super::Storage;
use crate::FragmaError;

const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
enum Stored {
    Counter(u64),
    Json(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Stored,
    expires_at: Instant,
}

/// In-process storage adapter.
///
/// A single map holds either an integer counter or an opaque JSON document
/// per key, each with its own expiry. Per-key entry locks make `increment`
/// atomic; every read checks expiry itself, so correctness never depends on
/// the background reaper.
///
/// A reaper thread removes expired entries (default cadence one minute) and
/// stops on [`close`](Storage::close) or drop. State is process-scoped: use a
/// remote adapter when multiple instances must share limits.
pub struct MemoryStorage {
    entries: Arc<DashMap<String, Entry>>,
    closed: Arc<AtomicBool>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_reap_interval(DEFAULT_REAP_INTERVAL)
    }

    /// Create a storage instance whose reaper wakes every `interval`.
    pub fn with_reap_interval(interval: Duration) -> Self {
        let entries: Arc<DashMap<String, Entry>> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        let reaper = {
            let entries = Arc::clone(&entries);
            let closed = Arc::clone(&closed);

            thread::spawn(move || {
                loop {
                    thread::park_timeout(interval);

                    if closed.load(Ordering::Acquire) {
                        break;
                    }

                    let before = entries.len();
                    let now = Instant::now();
                    entries.retain(|_, entry| entry.expires_at > now);

                    let removed = before.saturating_sub(entries.len());
                    if removed > 0 {
                        tracing::trace!(removed, "memory storage reaper removed expired entries");
                    }
                }
            })
        };

        Self {
            entries,
            closed,
            reaper: Mutex::new(Some(reaper)),
        }
    } // end constructor

    fn ensure_open(&self) -> Result<(), FragmaError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FragmaError::StorageClosed);
        }
        Ok(())
    }

    fn stop_reaper(&self) {
        self.closed.store(true, Ordering::Release);

        if let Ok(mut guard) = self.reaper.lock() {
            if let Some(handle) = guard.take() {
                handle.thread().unpark();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> Result<u64, FragmaError> {
        self.ensure_open()?;

        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: Stored::Counter(0),
                expires_at: now + ttl,
            });

        // An expired or non-counter entry restarts from zero.
        if entry.expires_at <= now || !matches!(entry.value, Stored::Counter(_)) {
            entry.value = Stored::Counter(0);
        }

        let count = match &mut entry.value {
            Stored::Counter(count) => {
                *count = count.saturating_add(amount);
                *count
            }
            Stored::Json(_) => unreachable!("non-counter entries are reset above"),
        };
        entry.expires_at = now + ttl;

        Ok(count)
    } // end method increment

    async fn get(&self, key: &str) -> Result<u64, FragmaError> {
        self.ensure_open()?;

        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => match &entry.value {
                Stored::Counter(count) => Ok(*count),
                Stored::Json(_) => Ok(0),
            },
            _ => Ok(0),
        }
    }

    async fn reset(&self, key: &str) -> Result<(), FragmaError> {
        self.ensure_open()?;

        self.entries.remove(key);
        Ok(())
    }

    async fn set_json(&self, key: &str, json: &[u8], ttl: Duration) -> Result<(), FragmaError> {
        self.ensure_open()?;

        self.entries.insert(
            key.to_string(),
            Entry {
                value: Stored::Json(json.to_vec()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<Vec<u8>>, FragmaError> {
        self.ensure_open()?;

        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => match &entry.value {
                Stored::Json(json) => Ok(Some(json.clone())),
                Stored::Counter(_) => Ok(None),
            },
            _ => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), FragmaError> {
        self.stop_reaper();
        tracing::debug!("memory storage closed");
        Ok(())
    }
}

impl Drop for MemoryStorage {
    fn drop(&mut self) {
        self.stop_reaper();
    }
}
