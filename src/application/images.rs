//! Port for the cover image storage collaborator.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("image payload is empty")]
    EmptyPayload,
    #[error("image name `{name}` is not a plain relative path")]
    InvalidName { name: String },
    #[error("image storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists `bytes` under `name`, replacing any existing file, and
    /// returns the stored name.
    async fn store(&self, name: &str, bytes: Bytes) -> Result<String, ImageStoreError>;

    /// Removes `name`. A file that is already gone counts as removed.
    async fn remove(&self, name: &str) -> Result<(), ImageStoreError>;
}
