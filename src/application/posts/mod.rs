//! Content repository: cache-aside reads and write-then-invalidate mutations
//! over the post store.

mod commands;
mod queries;
mod service;
mod types;

pub use service::{ContentRepository, MAX_SLUG_RACE_RETRIES};
pub use types::{
    ContentError, CreatePostCommand, CreatedPost, PostListView, PostView, UpdatePostCommand,
};
