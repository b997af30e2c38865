use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{PageMeta, PageWindow};
use crate::application::repos::RepoError;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugError, SlugResolveError};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("post not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Store(RepoError),
}

impl From<RepoError> for ContentError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            RepoError::Duplicate { constraint } => {
                Self::Conflict(format!("unique constraint `{constraint}` violated"))
            }
            RepoError::InvalidInput { message } => Self::InvalidInput(message),
            other => Self::Store(other),
        }
    }
}

impl From<DomainError> for ContentError {
    fn from(err: DomainError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<SlugError> for ContentError {
    fn from(err: SlugError) -> Self {
        match err {
            SlugError::Exhausted { .. } => Self::Conflict(err.to_string()),
            SlugError::EmptyInput | SlugError::Unrepresentable { .. } => {
                Self::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<SlugResolveError<RepoError>> for ContentError {
    fn from(err: SlugResolveError<RepoError>) -> Self {
        match err {
            SlugResolveError::Slug(err) => err.into(),
            SlugResolveError::Predicate(err) => err.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    /// Client-side file name of the cover image; only its extension is used.
    pub image_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPost {
    pub id: i64,
    pub slug: String,
    /// Name the cover image must be stored under.
    pub image_path: String,
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdatePostCommand {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Public representation of a post, as cached and as served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub image_path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

impl From<PostRecord> for PostView {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            slug: record.slug,
            image_path: record.image_path,
            published_at: record.published_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostListView {
    pub total: u64,
    pub blogs: Vec<PostView>,
    pub meta: PageMeta,
}

impl PostListView {
    pub fn assemble(records: Vec<PostRecord>, total: u64, window: PageWindow) -> Self {
        Self {
            total,
            blogs: records.into_iter().map(PostView::from).collect(),
            meta: PageMeta::new(window, total),
        }
    }
}
