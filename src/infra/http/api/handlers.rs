mod auth;
mod posts;

pub use auth::{create_admin, login, logout};
pub use posts::{create_post, delete_post, get_post, list_posts, update_post};

use axum::extract::rejection::{JsonRejection, PathRejection};

use super::error::ApiError;

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
}

fn path_rejection(rejection: PathRejection) -> ApiError {
    ApiError::bad_request("Invalid blog ID", Some(rejection.body_text()))
}
