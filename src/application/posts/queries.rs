use tracing::debug;

use crate::application::pagination::PageWindow;
use crate::cache::CacheKey;

use super::service::ContentRepository;
use super::types::{ContentError, PostListView, PostView};

impl ContentRepository {
    /// One page of the feed, newest first.
    ///
    /// A cached page is returned as stored, without checking it against the
    /// store; writes keep it honest by sweeping every `list:` key.
    pub async fn get_all(&self, page: u32, limit: u32) -> Result<PostListView, ContentError> {
        let window = PageWindow::new(page, limit)?;
        let key = CacheKey::PostList { page, limit };

        if let Some(cached) = self.cache_lookup::<PostListView>(key).await {
            return Ok(cached);
        }

        let total = self.posts.count_posts().await?;
        let records = self
            .posts
            .list_posts_page(window.limit(), window.offset())
            .await?;
        debug!(page, limit, total, fetched = records.len(), "Loaded feed page from store");

        let view = PostListView::assemble(records, total, window);
        self.cache_fill(key, &view).await;
        Ok(view)
    }

    /// A single post by slug. A cached copy may outlive a deletion that
    /// bypassed this repository until its TTL runs out.
    pub async fn get_by_slug(&self, slug: &str) -> Result<PostView, ContentError> {
        let key = CacheKey::PostBySlug(slug);

        if let Some(cached) = self.cache_lookup::<PostView>(key).await {
            return Ok(cached);
        }

        let record = self
            .posts
            .find_post_by_slug(slug)
            .await?
            .ok_or(ContentError::NotFound)?;

        let view = PostView::from(record);
        self.cache_fill(key, &view).await;
        Ok(view)
    }
}
