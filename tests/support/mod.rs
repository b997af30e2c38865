//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use scriptorium::application::images::{ImageStore, ImageStoreError};
use scriptorium::application::posts::ContentRepository;
use scriptorium::application::repos::{
    AdminsRepo, FieldValue, NewAdmin, NewPost, POSTS_SLUG_CONSTRAINT, PostChanges, PostField,
    PostHandle, PostsRepo, RepoError, StoreHealth,
};
use scriptorium::application::side_effects::{SideEffectFailure, SideEffectSink};
use scriptorium::cache::{CacheError, CacheStore, CacheTtls, MemoryCache};
use scriptorium::domain::entities::{AdminRecord, PostRecord};
use time::OffsetDateTime;

/// Post table with the same uniqueness rule as `posts_slug_key`.
#[derive(Default)]
pub struct InMemoryPosts {
    rows: Mutex<Vec<PostRecord>>,
    next_id: AtomicUsize,
    /// Pending writes that lose their slug to a simulated concurrent writer.
    races: AtomicU32,
    inserts: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryPosts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next `count` writes lose their slug: another writer inserts
    /// a row with the same slug just before the write lands.
    pub fn lose_slug_races(&self, count: u32) {
        self.races.store(count, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<PostRecord> {
        self.rows.lock().expect("posts lock").clone()
    }

    /// Inserts a row behind the repository's back, bypassing cache upkeep.
    pub fn insert_directly(&self, title: &str, slug: &str) -> i64 {
        let mut rows = self.rows.lock().expect("posts lock");
        self.push_row(&mut rows, title, "written elsewhere", slug, &format!("{slug}_image.png"))
    }

    fn push_row(
        &self,
        rows: &mut Vec<PostRecord>,
        title: &str,
        content: &str,
        slug: &str,
        image_path: &str,
    ) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let now = OffsetDateTime::now_utc();
        rows.push(PostRecord {
            id,
            title: title.to_string(),
            content: content.to_string(),
            slug: slug.to_string(),
            image_path: image_path.to_string(),
            published_at: now,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn lose_race(&self, rows: &mut Vec<PostRecord>, slug: &str) -> bool {
        let pending = self.races.load(Ordering::SeqCst);
        if pending == 0 {
            return false;
        }
        self.races.store(pending - 1, Ordering::SeqCst);
        self.push_row(rows, "Concurrent", "racing writer", slug, &format!("{slug}_image.png"));
        true
    }
}

fn slug_taken() -> RepoError {
    RepoError::Duplicate {
        constraint: POSTS_SLUG_CONSTRAINT.to_string(),
    }
}

#[async_trait]
impl PostsRepo for InMemoryPosts {
    async fn insert_post(&self, post: NewPost) -> Result<i64, RepoError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().expect("posts lock");
        if self.lose_race(&mut rows, &post.slug) || rows.iter().any(|row| row.slug == post.slug) {
            return Err(slug_taken());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        rows.push(PostRecord {
            id,
            title: post.title,
            content: post.content,
            slug: post.slug,
            image_path: post.image_path,
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        });
        Ok(id)
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        Ok(self.rows.lock().expect("posts lock").len() as u64)
    }

    async fn list_posts_page(&self, limit: u32, offset: u64) -> Result<Vec<PostRecord>, RepoError> {
        let mut rows = self.rows();
        rows.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.rows().into_iter().find(|row| row.slug == slug))
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        Ok(self
            .rows()
            .iter()
            .any(|row| row.slug == slug && Some(row.id) != exclude_id))
    }

    async fn update_post_fields(&self, id: i64, changes: &PostChanges) -> Result<(), RepoError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().expect("posts lock");

        if let Some(slug) = changes.text(PostField::Slug) {
            let slug = slug.to_string();
            if self.lose_race(&mut rows, &slug)
                || rows.iter().any(|row| row.slug == slug && row.id != id)
            {
                return Err(slug_taken());
            }
        }

        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(RepoError::NotFound)?;
        for (field, value) in changes.iter() {
            match (field, value) {
                (PostField::Title, FieldValue::Text(text)) => row.title = text.clone(),
                (PostField::Slug, FieldValue::Text(text)) => row.slug = text.clone(),
                (PostField::Content, FieldValue::Text(text)) => row.content = text.clone(),
                (PostField::UpdatedAt, FieldValue::Timestamp(at)) => row.updated_at = *at,
                (field, value) => {
                    return Err(RepoError::InvalidInput {
                        message: format!("{field:?} cannot hold {value:?}"),
                    });
                }
            }
        }
        Ok(())
    }

    async fn find_post_handle(&self, id: i64) -> Result<Option<PostHandle>, RepoError> {
        Ok(self
            .rows()
            .into_iter()
            .find(|row| row.id == id)
            .map(|row| PostHandle {
                slug: row.slug,
                image_path: row.image_path,
            }))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut rows = self.rows.lock().expect("posts lock");
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAdmins {
    rows: Mutex<Vec<AdminRecord>>,
}

#[async_trait]
impl AdminsRepo for InMemoryAdmins {
    async fn find_for_login(&self, identifier: &str) -> Result<Option<AdminRecord>, RepoError> {
        let rows = self.rows.lock().expect("admins lock");
        Ok(rows
            .iter()
            .find(|row| row.email == identifier || row.username == identifier)
            .cloned())
    }

    async fn admin_exists(&self, username: &str, email: &str) -> Result<bool, RepoError> {
        let rows = self.rows.lock().expect("admins lock");
        Ok(rows
            .iter()
            .any(|row| row.username == username || row.email == email))
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<AdminRecord, RepoError> {
        let mut rows = self.rows.lock().expect("admins lock");
        let record = AdminRecord {
            id: rows.len() as i64 + 1,
            username: admin.username,
            email: admin.email,
            password_hash: admin.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(record.clone());
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Get(String),
    Set(String, Duration),
    Delete(String),
    DeletePrefix(String),
}

/// Memory cache that remembers every call made against it.
pub struct RecordingCache {
    inner: MemoryCache,
    ops: Mutex<Vec<CacheOp>>,
}

impl RecordingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCache::new(NonZeroUsize::new(64).expect("non-zero")),
            ops: Mutex::new(Vec::new()),
        })
    }

    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().expect("ops lock").clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().expect("ops lock").clear();
    }

    pub fn writes(&self) -> Vec<CacheOp> {
        self.ops()
            .into_iter()
            .filter(|op| !matches!(op, CacheOp::Get(_)))
            .collect()
    }

    fn record(&self, op: CacheOp) {
        self.ops.lock().expect("ops lock").push(op);
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.record(CacheOp::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.record(CacheOp::Set(key.to_string(), ttl));
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.record(CacheOp::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        self.record(CacheOp::DeletePrefix(prefix.to_string()));
        self.inner.delete_prefix(prefix).await
    }
}

/// Cache whose backend is permanently down.
#[derive(Default)]
pub struct UnavailableCache;

fn unavailable() -> CacheError {
    CacheError::backend("test", "connection refused")
}

#[async_trait]
impl CacheStore for UnavailableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(unavailable())
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(unavailable())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(unavailable())
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(unavailable())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    failures: Mutex<Vec<SideEffectFailure>>,
}

impl RecordingSink {
    pub fn failures(&self) -> Vec<SideEffectFailure> {
        self.failures.lock().expect("sink lock").clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.failures().iter().map(SideEffectFailure::kind).collect()
    }
}

impl SideEffectSink for RecordingSink {
    fn report(&self, failure: SideEffectFailure) {
        self.failures.lock().expect("sink lock").push(failure);
    }
}

#[derive(Default)]
pub struct InMemoryImages {
    files: Mutex<HashMap<String, Bytes>>,
    fail_removal: AtomicBool,
    fail_store: AtomicBool,
}

impl InMemoryImages {
    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().expect("images lock").contains_key(name)
    }

    pub fn put(&self, name: &str, bytes: &'static [u8]) {
        self.files
            .lock()
            .expect("images lock")
            .insert(name.to_string(), Bytes::from_static(bytes));
    }

    pub fn fail_removals(&self) {
        self.fail_removal.store(true, Ordering::SeqCst);
    }

    pub fn fail_stores(&self) {
        self.fail_store.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for InMemoryImages {
    async fn store(&self, name: &str, bytes: Bytes) -> Result<String, ImageStoreError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(ImageStoreError::Io(std::io::Error::other("disk full")));
        }
        if bytes.is_empty() {
            return Err(ImageStoreError::EmptyPayload);
        }
        self.files
            .lock()
            .expect("images lock")
            .insert(name.to_string(), bytes);
        Ok(name.to_string())
    }

    async fn remove(&self, name: &str) -> Result<(), ImageStoreError> {
        if self.fail_removal.load(Ordering::SeqCst) {
            return Err(ImageStoreError::Io(std::io::Error::other("permission denied")));
        }
        self.files.lock().expect("images lock").remove(name);
        Ok(())
    }
}

pub struct SwitchableHealth {
    healthy: AtomicBool,
}

impl SwitchableHealth {
    pub fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(healthy),
        })
    }
}

#[async_trait]
impl StoreHealth for SwitchableHealth {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

/// Content repository wired to in-memory fakes.
pub struct Harness {
    pub posts: Arc<InMemoryPosts>,
    pub cache: Arc<RecordingCache>,
    pub images: Arc<InMemoryImages>,
    pub sink: Arc<RecordingSink>,
    pub content: ContentRepository,
}

impl Harness {
    pub fn new() -> Self {
        let posts = InMemoryPosts::new();
        let cache = RecordingCache::new();
        let images = Arc::new(InMemoryImages::default());
        let sink = Arc::new(RecordingSink::default());
        let content = ContentRepository::new(
            posts.clone(),
            cache.clone(),
            images.clone(),
            sink.clone(),
            CacheTtls::default(),
        );
        Self {
            posts,
            cache,
            images,
            sink,
            content,
        }
    }
}
