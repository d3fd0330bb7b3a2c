use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use memcache::{Client, CommandError, MemcacheError};

use super::Storage;
use crate::FragmaError;

/// Storage adapter backed by a Memcached server.
///
/// Counters map onto `INCR` with a `SET`-on-miss fallback seeding the initial
/// amount with the TTL; documents onto `SET`/`GET` of raw bytes. Memcached's
/// increment is unsigned, which the crate-wide `u64` amounts satisfy by
/// construction.
///
/// The `memcache` client is synchronous, so every call is bridged through
/// `tokio::task::spawn_blocking`.
pub struct MemcachedStorage {
    client: Arc<Client>,
    closed: AtomicBool,
}

impl MemcachedStorage {
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Arc::new(client),
            closed: AtomicBool::new(false),
        }
    }

    fn client(&self) -> Result<Arc<Client>, FragmaError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FragmaError::StorageClosed);
        }
        Ok(Arc::clone(&self.client))
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, FragmaError>
    where
        T: Send + 'static,
        F: FnOnce(&Client) -> Result<T, MemcacheError> + Send + 'static,
    {
        let client = self.client()?;

        let result = tokio::task::spawn_blocking(move || op(client.as_ref()))
            .await
            .map_err(|err| FragmaError::Storage(format!("memcached task failed: {err}")))?;

        Ok(result?)
    } // end method run_blocking
}

#[async_trait]
impl Storage for MemcachedStorage {
    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> Result<u64, FragmaError> {
        let key = key.to_string();
        let ttl_secs = ttl.as_secs() as u32;

        self.run_blocking(move |client| match client.increment(&key, amount) {
            Ok(count) => Ok(count),
            Err(MemcacheError::CommandError(CommandError::KeyNotFound)) => {
                // Counters are stored as decimal strings so INCR can parse them.
                client.set(&key, amount.to_string(), ttl_secs)?;
                Ok(amount)
            }
            Err(err) => Err(err),
        })
        .await
    } // end method increment

    async fn get(&self, key: &str) -> Result<u64, FragmaError> {
        let key = key.to_string();

        let raw: Option<String> = self
            .run_blocking(move |client| client.get::<String>(&key))
            .await?;

        match raw {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|err| FragmaError::Storage(format!("non-numeric counter value: {err}"))),
            None => Ok(0),
        }
    }

    async fn reset(&self, key: &str) -> Result<(), FragmaError> {
        let key = key.to_string();

        // `delete` reports whether the key existed; a miss is fine here.
        self.run_blocking(move |client| client.delete(&key).map(|_| ()))
            .await
    }

    async fn set_json(&self, key: &str, json: &[u8], ttl: Duration) -> Result<(), FragmaError> {
        let key = key.to_string();
        let json = json.to_vec();
        let ttl_secs = ttl.as_secs() as u32;

        self.run_blocking(move |client| client.set(&key, json.as_slice(), ttl_secs))
            .await
    }

    async fn get_json(&self, key: &str) -> Result<Option<Vec<u8>>, FragmaError> {
        let key = key.to_string();

        self.run_blocking(move |client| client.get::<Vec<u8>>(&key))
            .await
    }

    async fn close(&self) -> Result<(), FragmaError> {
        // The client was handed in by the caller; dropping our reference when
        // the limiter goes away closes its connections.
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
