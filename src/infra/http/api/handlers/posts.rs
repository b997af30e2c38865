use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use tracing::{error, info};

use crate::application::pagination::PageWindow;
use crate::application::posts::{CreatePostCommand, UpdatePostCommand};

use super::super::error::ApiError;
use super::super::models::{
    CreatePostResponse, CreatedBlog, FeedQuery, PostMutationResponse, UpdatePostRequest,
};
use super::super::state::ApiState;
use super::{json_rejection, path_rejection};

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = PageWindow::from_query(query.page.as_deref(), query.limit.as_deref());
    let feed = state.content.get_all(window.page(), window.limit()).await?;
    Ok(Json(feed))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.content.get_by_slug(&slug).await?;
    Ok(Json(post))
}

#[derive(Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    image: Option<(String, Bytes)>,
}

pub async fn create_post(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request("Failed to parse form", Some(err.to_string())))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => form.title = Some(read_text(field).await?),
            Some("content") => form.content = Some(read_text(field).await?),
            Some("image") => {
                let file_name = field.file_name().map(str::to_owned).unwrap_or_default();
                let data = field.bytes().await.map_err(|err| {
                    ApiError::bad_request("Failed to read image", Some(err.to_string()))
                })?;
                form.image = Some((file_name, data));
            }
            _ => {}
        }
    }

    let (Some(title), Some(content)) = (form.title, form.content) else {
        return Err(ApiError::bad_request(
            "Title and content are required",
            None,
        ));
    };
    let Some((file_name, data)) = form.image.filter(|(_, data)| !data.is_empty()) else {
        return Err(ApiError::bad_request("Image is required", None));
    };

    let created = state
        .content
        .create(CreatePostCommand {
            title: title.clone(),
            content: content.clone(),
            image_file_name: file_name,
        })
        .await?;

    if let Err(err) = state.images.store(&created.image_path, data).await {
        // Without its image the post is unusable; take it back out.
        if let Err(rollback) = state.content.delete(created.id).await {
            error!(
                id = created.id,
                error = %rollback,
                "Failed to remove post after image upload failure"
            );
        }
        return Err(err.into());
    }

    info!(id = created.id, slug = %created.slug, "Blog post published");
    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Blog post created successfully",
            blog: CreatedBlog {
                id: created.id,
                title,
                content,
                slug: created.slug,
                image_url: created.image_path,
            },
        }),
    ))
}

pub async fn update_post(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_rejection)?;
    let Json(payload) = payload.map_err(json_rejection)?;

    let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
    if blank(&payload.title) && blank(&payload.content) {
        return Err(ApiError::bad_request(
            "At least one field (title or content) must be provided",
            None,
        ));
    }

    let slug = state
        .content
        .update(
            id,
            UpdatePostCommand {
                title: payload.title,
                content: payload.content,
            },
        )
        .await?;

    Ok(Json(PostMutationResponse {
        message: "Blog post updated successfully",
        slug,
    }))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_rejection)?;
    let slug = state.content.delete(id).await?;

    Ok(Json(PostMutationResponse {
        message: "Blog post deleted successfully",
        slug,
    }))
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::bad_request("Failed to parse form", Some(err.to_string())))
}
