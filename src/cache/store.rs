//! The cache contract consumed by the content repository.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{backend} cache backend failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[error("cache operation `{op}` timed out after {elapsed:?}")]
    Timeout { op: &'static str, elapsed: Duration },
}

impl CacheError {
    pub fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend,
            message: err.to_string(),
        }
    }
}

/// String-valued cache with per-entry TTL. Implementations must be safe to
/// share between request tasks.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` on a miss or an expired entry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Deletes every key starting with `prefix` and returns how many went.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;
}
