use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::application::images::ImageStore;
use crate::application::repos::PostsRepo;
use crate::application::side_effects::{SideEffectFailure, SideEffectSink};
use crate::cache::{CacheKey, CacheStore, CacheTtls};
use crate::domain::slug::resolve_unique_slug;

use super::types::ContentError;

/// Times an insert or update is re-resolved after losing a slug race to a
/// concurrent writer.
pub const MAX_SLUG_RACE_RETRIES: u32 = 3;

/// Orchestrates the post store, the cache and the image store.
///
/// Reads go cache first and repopulate on a miss. Writes hit the store first
/// and only then delete every cache key that could still serve the old view.
/// Cache and image cleanup failures never fail an operation; they are
/// reported to the [`SideEffectSink`].
#[derive(Clone)]
pub struct ContentRepository {
    pub(super) posts: Arc<dyn PostsRepo>,
    pub(super) cache: Arc<dyn CacheStore>,
    pub(super) images: Arc<dyn ImageStore>,
    pub(super) sink: Arc<dyn SideEffectSink>,
    pub(super) ttls: CacheTtls,
}

impl ContentRepository {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        cache: Arc<dyn CacheStore>,
        images: Arc<dyn ImageStore>,
        sink: Arc<dyn SideEffectSink>,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            posts,
            cache,
            images,
            sink,
            ttls,
        }
    }

    /// First free slug at or after `base`, ignoring the post `exclude_id`.
    pub(super) async fn resolve_slug(
        &self,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, ContentError> {
        let posts = &self.posts;
        let slug = resolve_unique_slug(base, |candidate| async move {
            posts.slug_exists(&candidate, exclude_id).await
        })
        .await?;
        Ok(slug)
    }

    /// Cached value under `key`, or `None` on a miss or any cache failure.
    pub(super) async fn cache_lookup<T>(&self, key: CacheKey<'_>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let rendered = key.to_string();
        let raw = match self.cache.get(&rendered).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!("scriptorium_cache_miss_total", "kind" => key.kind()).increment(1);
                debug!(key = %rendered, "Cache miss");
                return None;
            }
            Err(err) => {
                self.sink.report(SideEffectFailure::CacheRead {
                    key: rendered,
                    reason: err.to_string(),
                });
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!("scriptorium_cache_hit_total", "kind" => key.kind()).increment(1);
                debug!(key = %rendered, "Cache hit");
                Some(value)
            }
            Err(err) => {
                self.sink.report(SideEffectFailure::CacheDecode {
                    key: rendered,
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    pub(super) async fn cache_fill<T>(&self, key: CacheKey<'_>, value: &T)
    where
        T: Serialize + Sync,
    {
        let rendered = key.to_string();
        let ttl = match key {
            CacheKey::PostList { .. } => self.ttls.list,
            CacheKey::PostBySlug(_) => self.ttls.post,
        };

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.sink.report(SideEffectFailure::CacheEncode {
                    key: rendered,
                    reason: err.to_string(),
                });
                return;
            }
        };

        if let Err(err) = self.cache.set(&rendered, encoded, ttl).await {
            self.sink.report(SideEffectFailure::CacheWrite {
                key: rendered,
                reason: err.to_string(),
            });
        }
    }

    /// Drops every cached feed page, whatever its page and limit.
    pub(super) async fn invalidate_feed(&self) {
        match self.cache.delete_prefix(CacheKey::LIST_PREFIX).await {
            Ok(removed) => {
                counter!("scriptorium_cache_invalidate_total", "kind" => "list")
                    .increment(removed as u64);
                debug!(removed, "Invalidated cached feed pages");
            }
            Err(err) => self.sink.report(SideEffectFailure::CacheInvalidate {
                key: CacheKey::LIST_PREFIX.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    pub(super) async fn invalidate_post(&self, slug: &str) {
        let key = CacheKey::PostBySlug(slug).to_string();
        match self.cache.delete(&key).await {
            Ok(()) => {
                counter!("scriptorium_cache_invalidate_total", "kind" => "post").increment(1);
            }
            Err(err) => self.sink.report(SideEffectFailure::CacheInvalidate {
                key,
                reason: err.to_string(),
            }),
        }
    }
}
