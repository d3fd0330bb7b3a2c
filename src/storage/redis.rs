use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use super::Storage;
use crate::FragmaError;

/// Storage adapter backed by a Redis server.
///
/// Counters map onto `INCRBY`/`EXPIRE` (pipelined) and `GET`; documents onto
/// `SET` with `EX` and `GET`. The connection manager is supplied by the
/// caller and cloned per call, which is how the `redis` crate multiplexes a
/// single connection across tasks.
pub struct RedisStorage {
    connection_manager: ConnectionManager,
    closed: AtomicBool,
}

impl RedisStorage {
    pub fn from_connection_manager(connection_manager: ConnectionManager) -> Self {
        Self {
            connection_manager,
            closed: AtomicBool::new(false),
        }
    }

    fn connection(&self) -> Result<ConnectionManager, FragmaError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FragmaError::StorageClosed);
        }
        Ok(self.connection_manager.clone())
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> Result<u64, FragmaError> {
        let mut conn = self.connection()?;

        let (count,): (i64,) = redis::pipe()
            .incr(key, amount as i64)
            .expire(key, ttl.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count.max(0) as u64)
    } // end method increment

    async fn get(&self, key: &str) -> Result<u64, FragmaError> {
        let mut conn = self.connection()?;

        let count: Option<i64> = conn.get(key).await?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    async fn reset(&self, key: &str) -> Result<(), FragmaError> {
        let mut conn = self.connection()?;

        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn set_json(&self, key: &str, json: &[u8], ttl: Duration) -> Result<(), FragmaError> {
        let mut conn = self.connection()?;

        let _: () = conn.set_ex(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<Vec<u8>>, FragmaError> {
        let mut conn = self.connection()?;

        let json: Option<Vec<u8>> = conn.get(key).await?;
        Ok(json)
    }

    async fn close(&self) -> Result<(), FragmaError> {
        // The connection manager is owned by the caller that created it;
        // there is nothing to tear down here beyond refusing further use.
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
