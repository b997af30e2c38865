pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::{ApiState, SessionSettings};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
};

pub fn build_api_router(state: ApiState) -> Router<ApiState> {
    let admin = Router::new()
        .route("/api/v1/admin/blogs", post(handlers::create_post))
        .route(
            "/api/v1/admin/blogs/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    let bootstrap = Router::new()
        .route("/api/v1/auth/admin/create", post(handlers::create_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_api_key,
        ));

    Router::new()
        .route("/api/v1/blogs", get(handlers::list_posts))
        .route("/api/v1/blogs/{slug}", get(handlers::get_post))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .merge(admin)
        .merge(bootstrap)
}
