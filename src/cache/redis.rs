//! Redis cache adapter.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, Pipeline, aio::ConnectionManager};
use tracing::debug;

use super::store::{CacheError, CacheStore};

const BACKEND: &str = "redis";
const SCAN_BATCH: usize = 100;

/// Shared cache backed by Redis. Every call is bounded by `operation_timeout`
/// so a stalled server degrades requests to cache misses instead of hanging
/// them.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    operation_timeout: Duration,
}

impl RedisCache {
    pub async fn connect(url: &str, operation_timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|err| CacheError::backend(BACKEND, err))?;
        let manager = tokio::time::timeout(operation_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout {
                op: "connect",
                elapsed: operation_timeout,
            })?
            .map_err(|err| CacheError::backend(BACKEND, err))?;

        Ok(Self {
            manager,
            operation_timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result.map_err(|err| CacheError::backend(BACKEND, err)),
            Err(_) => Err(CacheError::Timeout {
                op,
                elapsed: self.operation_timeout,
            }),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        self.bounded("get", async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        self.bounded("set", async move {
            conn.set_ex::<_, _, ()>(key, value, seconds).await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        self.bounded("delete", async move { conn.del::<_, ()>(key).await })
            .await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut conn = self.manager.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut deleted = 0;

        // SCAN rather than KEYS so a large keyspace never blocks the server.
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = self
                .bounded("scan", async {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await
                })
                .await?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                self.bounded("delete_prefix", async {
                    pipe.query_async::<_, ()>(&mut conn).await
                })
                .await?;
                deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(prefix, deleted, "Swept redis cache keys by prefix");
        Ok(deleted)
    }
}
