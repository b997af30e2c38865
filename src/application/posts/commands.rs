use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::repos::{NewPost, PostChanges, PostField};
use crate::application::side_effects::SideEffectFailure;
use crate::domain::error::ensure_present;
use crate::domain::images::{image_extension, image_file_name};
use crate::domain::slug::derive_slug;

use super::service::{ContentRepository, MAX_SLUG_RACE_RETRIES};
use super::types::{ContentError, CreatePostCommand, CreatedPost, UpdatePostCommand};

impl ContentRepository {
    /// Inserts a post under a freshly resolved slug and returns the image
    /// name the caller must store the upload under.
    pub async fn create(&self, command: CreatePostCommand) -> Result<CreatedPost, ContentError> {
        ensure_present("title", &command.title)?;
        ensure_present("content", &command.content)?;
        let extension = image_extension(&command.image_file_name)?;
        let base = derive_slug(&command.title)?;

        for attempt in 0..=MAX_SLUG_RACE_RETRIES {
            let slug = self.resolve_slug(&base, None).await?;
            let image_path = image_file_name(&slug, extension);
            let now = OffsetDateTime::now_utc();

            let post = NewPost {
                title: command.title.clone(),
                content: command.content.clone(),
                slug: slug.clone(),
                image_path: image_path.clone(),
                published_at: now,
                created_at: now,
                updated_at: now,
            };

            match self.posts.insert_post(post).await {
                Ok(id) => {
                    self.invalidate_feed().await;
                    info!(id, slug = %slug, "Post created");
                    return Ok(CreatedPost {
                        id,
                        slug,
                        image_path,
                    });
                }
                Err(err) if err.is_slug_conflict() => {
                    warn!(attempt, slug = %slug, "Slug claimed concurrently; resolving again");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(slug_race_lost(&base))
    }

    /// Applies a partial update and returns the slug the post had before it.
    ///
    /// A command with neither field is a no-op: nothing is written and no
    /// cache key is touched. Supplying only blank fields is rejected.
    pub async fn update(&self, id: i64, command: UpdatePostCommand) -> Result<String, ContentError> {
        let supplied = !command.is_empty();
        let title = command.title.filter(|title| !title.trim().is_empty());
        let content = command.content.filter(|content| !content.trim().is_empty());
        if supplied && title.is_none() && content.is_none() {
            return Err(ContentError::InvalidInput(
                "at least one of `title` or `content` must be non-empty".into(),
            ));
        }
        let base = title.as_deref().map(derive_slug).transpose()?;

        let existing = self
            .posts
            .find_post_handle(id)
            .await?
            .ok_or(ContentError::NotFound)?;

        for attempt in 0..=MAX_SLUG_RACE_RETRIES {
            let mut changes = PostChanges::new();
            if let (Some(title), Some(base)) = (&title, &base) {
                let slug = self.resolve_slug(base, Some(id)).await?;
                changes
                    .set_text(PostField::Title, title.clone())
                    .set_text(PostField::Slug, slug);
            }
            if let Some(content) = &content {
                changes.set_text(PostField::Content, content.clone());
            }

            if changes.is_empty() {
                return Ok(existing.slug);
            }
            changes.touch(OffsetDateTime::now_utc());

            match self.posts.update_post_fields(id, &changes).await {
                Ok(()) => {
                    self.invalidate_feed().await;
                    self.invalidate_post(&existing.slug).await;
                    info!(
                        id,
                        old_slug = %existing.slug,
                        new_slug = changes.text(PostField::Slug).unwrap_or(&existing.slug),
                        "Post updated"
                    );
                    return Ok(existing.slug);
                }
                Err(err) if err.is_slug_conflict() => {
                    warn!(attempt, id, "Slug claimed concurrently during update; resolving again");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(slug_race_lost(base.as_deref().unwrap_or(&existing.slug)))
    }

    /// Removes the post and its cover image; returns the slug it had.
    pub async fn delete(&self, id: i64) -> Result<String, ContentError> {
        let handle = self
            .posts
            .find_post_handle(id)
            .await?
            .ok_or(ContentError::NotFound)?;

        if let Err(err) = self.images.remove(&handle.image_path).await {
            self.sink.report(SideEffectFailure::ImageRemoval {
                image: handle.image_path.clone(),
                reason: err.to_string(),
            });
        }

        self.posts.delete_post(id).await?;

        self.invalidate_feed().await;
        self.invalidate_post(&handle.slug).await;
        info!(id, slug = %handle.slug, "Post deleted");
        Ok(handle.slug)
    }
}

fn slug_race_lost(base: &str) -> ContentError {
    ContentError::Conflict(format!(
        "slug based on `{base}` kept being claimed by concurrent writers"
    ))
}
