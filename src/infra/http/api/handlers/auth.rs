use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::auth::CreateAdminCommand;

use super::super::error::ApiError;
use super::super::middleware::AUTH_COOKIE;
use super::super::models::{
    AdminSummary, CreateAdminRequest, CreateAdminResponse, LoginRequest, LoginResponse,
    MessageResponse,
};
use super::super::state::ApiState;
use super::json_rejection;

pub async fn login(
    State(state): State<ApiState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let outcome = state.auth.login(&payload.email, &payload.password).await?;

    let cookie = Cookie::build((AUTH_COOKIE, outcome.token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.session.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(state.auth.token_ttl());

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            id: outcome.admin.id,
            username: outcome.admin.username,
            email: outcome.admin.email,
            token: outcome.token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(AUTH_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

pub async fn create_admin(
    State(state): State<ApiState>,
    payload: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let admin = state
        .auth
        .create_admin(CreateAdminCommand {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            message: "Admin created successfully",
            admin: AdminSummary {
                id: admin.id,
                username: admin.username,
                email: admin.email,
            },
        }),
    ))
}
