//! Cache configuration derived from the `[cache]` settings section.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{CacheBackend, CacheSettings};

const DEFAULT_LIST_TTL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_POST_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_MEMORY_CAPACITY: usize = 1024;
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(250);

/// How long each kind of cached view may be served before it is refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Feed pages (`list:` keys).
    pub list: Duration,
    /// Single posts (`slug:` keys).
    pub post: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            list: DEFAULT_LIST_TTL,
            post: DEFAULT_POST_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub memory_capacity: NonZeroUsize,
    pub operation_timeout: Duration,
    pub ttls: CacheTtls,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            memory_capacity: NonZeroUsize::new(DEFAULT_MEMORY_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            ttls: CacheTtls::default(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            memory_capacity: settings.memory_capacity,
            operation_timeout: Duration::from_millis(settings.operation_timeout_ms.get()),
            ttls: CacheTtls {
                list: Duration::from_secs(settings.list_ttl_seconds.get()),
                post: Duration::from_secs(settings.post_ttl_seconds.get()),
            },
        }
    }
}
