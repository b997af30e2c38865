use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    FieldValue, NewPost, PostChanges, PostHandle, PostsRepo, RepoError,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const POST_COLUMNS: &str =
    "id, title, content, slug, image_path, published_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    slug: String,
    image_path: String,
    published_at: OffsetDateTime,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            slug: row.slug,
            image_path: row.image_path,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HandleRow {
    slug: String,
    image_path: String,
}

/// Renders `UPDATE posts SET ... WHERE id = $n`. Column names come from
/// [`crate::application::repos::PostField`] only; every value is bound.
fn build_update<'a>(id: i64, changes: &'a PostChanges) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE posts SET ");
    {
        let mut assignments = qb.separated(", ");
        for (field, value) in changes.iter() {
            assignments.push(field.column());
            assignments.push_unseparated(" = ");
            match value {
                FieldValue::Text(text) => assignments.push_bind_unseparated(text.as_str()),
                FieldValue::Timestamp(at) => assignments.push_bind_unseparated(*at),
            };
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn insert_post(&self, post: NewPost) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO posts (title, content, slug, image_path, published_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(post.title)
        .bind(post.content)
        .bind(post.slug)
        .bind(post.image_path)
        .bind(post.published_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    async fn list_posts_page(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: format!("offset {offset} is out of range"),
        })?;

        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             ORDER BY published_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_post_fields(&self, id: i64, changes: &PostChanges) -> Result<(), RepoError> {
        if changes.is_empty() {
            return Ok(());
        }

        let result = build_update(id, changes)
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_post_handle(&self, id: i64) -> Result<Option<PostHandle>, RepoError> {
        let row = sqlx::query_as::<_, HandleRow>(
            "SELECT slug, image_path FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| PostHandle {
            slug: row.slug,
            image_path: row.image_path,
        }))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
