//! Cache layer
//!
//! A key/value store with per-entry TTL sitting in front of Postgres. The
//! content repository reads through it and invalidates it after every write;
//! entries are never corrected in place.
//!
//! Two adapters implement [`CacheStore`]:
//!
//! - [`MemoryCache`]: bounded LRU with expiry, one per process
//! - [`RedisCache`]: shared Redis instance via a reconnecting connection manager
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! list_ttl_seconds = 600
//! post_ttl_seconds = 1800
//! ```

mod config;
mod keys;
mod memory;
mod redis;
mod store;

pub use config::{CacheConfig, CacheTtls};
pub use keys::CacheKey;
pub use memory::MemoryCache;
pub use redis::RedisCache;
pub use store::{CacheError, CacheStore};
