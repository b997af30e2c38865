use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::error::ApiError;
use super::state::ApiState;

pub const AUTH_COOKIE: &str = "authToken";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Admits requests carrying a valid admin token, from the `authToken` cookie
/// or an `Authorization: Bearer` header, and exposes its claims as a request
/// extension.
pub async fn require_admin(
    State(state): State<ApiState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = jar
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| extract_bearer(request.headers().get(AUTHORIZATION)));

    let Some(token) = token else {
        return ApiError::unauthorized("Authentication required").into_response();
    };

    let claims = match state.auth.verify(&token) {
        Ok(claims) => claims,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(claims.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(claims);
    response
}

/// Guards the admin bootstrap route with the configured `X-API-Key`.
pub async fn require_api_key(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.session.admin_api_key.as_deref() else {
        warn!(
            target = "scriptorium::api::bootstrap",
            "admin bootstrap attempted without a configured API key"
        );
        return ApiError::forbidden("Admin creation is disabled").into_response();
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default();

    if !bool::from(provided.ct_eq(expected.as_bytes())) {
        return ApiError::forbidden("Invalid API key").into_response();
    }

    next.run(request).await
}

fn extract_bearer(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_tokens_are_extracted() {
        let value = HeaderValue::from_static("Bearer abc.def");
        assert_eq!(extract_bearer(Some(&value)).as_deref(), Some("abc.def"));

        let basic = HeaderValue::from_static("Basic Zm9v");
        assert_eq!(extract_bearer(Some(&basic)), None);
        let empty = HeaderValue::from_static("Bearer ");
        assert_eq!(extract_bearer(Some(&empty)), None);
        assert_eq!(extract_bearer(None), None);
    }
}
