//! Filesystem storage for post cover images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::application::images::{ImageStore, ImageStoreError};

/// Stores images as flat files under a root directory, typically the one
/// served at `/uploads`.
#[derive(Debug)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for `name`, refusing anything that could escape the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ImageStoreError> {
        let relative = Path::new(name);
        let escapes = relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            });

        if name.is_empty() || escapes {
            return Err(ImageStoreError::InvalidName {
                name: name.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, name: &str, bytes: Bytes) -> Result<String, ImageStoreError> {
        if bytes.is_empty() {
            return Err(ImageStoreError::EmptyPayload);
        }

        let absolute = self.resolve(name)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&bytes).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        debug!(name, size_bytes = bytes.len(), "Stored image");
        Ok(name.to_string())
    }

    async fn remove(&self, name: &str) -> Result<(), ImageStoreError> {
        let absolute = self.resolve(name)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ImageStoreError::Io(err)),
        }
    }
}
