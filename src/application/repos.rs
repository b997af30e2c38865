//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{AdminRecord, PostRecord};

/// Unique constraint guarding `posts.slug`.
pub const POSTS_SLUG_CONSTRAINT: &str = "posts_slug_key";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Another writer claimed the slug between resolution and the write.
    pub fn is_slug_conflict(&self) -> bool {
        matches!(self, Self::Duplicate { constraint } if constraint == POSTS_SLUG_CONSTRAINT)
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub slug: String,
    pub image_path: String,
    pub published_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Columns an in-place post update may touch. Adapters emit SQL identifiers
/// from this list only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostField {
    Title,
    Slug,
    Content,
    UpdatedAt,
}

impl PostField {
    pub const fn column(self) -> &'static str {
        match self {
            PostField::Title => "title",
            PostField::Slug => "slug",
            PostField::Content => "content",
            PostField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Timestamp(OffsetDateTime),
}

/// Ordered set of column assignments for a single `UPDATE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    entries: Vec<(PostField, FieldValue)>,
}

impl PostChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field`, replacing any earlier value for the same column.
    pub fn set(&mut self, field: PostField, value: FieldValue) -> &mut Self {
        match self.entries.iter_mut().find(|(existing, _)| *existing == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
        self
    }

    pub fn set_text(&mut self, field: PostField, value: impl Into<String>) -> &mut Self {
        self.set(field, FieldValue::Text(value.into()))
    }

    pub fn touch(&mut self, at: OffsetDateTime) -> &mut Self {
        self.set(PostField::UpdatedAt, FieldValue::Timestamp(at))
    }

    pub fn get(&self, field: PostField) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == field)
            .map(|(_, value)| value)
    }

    pub fn text(&self, field: PostField) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PostField, &FieldValue)> {
        self.entries.iter().map(|(field, value)| (*field, value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Slug and image reference of a stored post, enough to clean up after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    pub slug: String,
    pub image_path: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> Result<i64, RepoError>;

    async fn count_posts(&self) -> Result<u64, RepoError>;

    /// Newest first by `published_at`, ties broken by descending id.
    async fn list_posts_page(&self, limit: u32, offset: u64)
    -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no row has `id`.
    async fn update_post_fields(&self, id: i64, changes: &PostChanges) -> Result<(), RepoError>;

    async fn find_post_handle(&self, id: i64) -> Result<Option<PostHandle>, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no row has `id`.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait AdminsRepo: Send + Sync {
    /// Matches `identifier` against email or username.
    async fn find_for_login(&self, identifier: &str) -> Result<Option<AdminRecord>, RepoError>;

    async fn admin_exists(&self, username: &str, email: &str) -> Result<bool, RepoError>;

    async fn insert_admin(&self, admin: NewAdmin) -> Result<AdminRecord, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
