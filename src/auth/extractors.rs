use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use super::claims::{Claims, Session};
use crate::state::AppState;

/// Pull raw token material from the session cookie (plain or `__Secure-`
/// prefixed) or, failing that, from a bearer Authorization header.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let secure_name = format!("__Secure-{cookie_name}");
    if let Some(cookie) = jar.get(cookie_name).or_else(|| jar.get(&secure_name)) {
        return Some(cookie.value().to_string());
    }

    let auth = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
}

pub fn resolve_session(headers: &HeaderMap, state: &AppState) -> Session {
    let token = session_token(headers, &state.config.session.cookie_name);
    state.jwt.resolve(token.as_deref())
}

/// Any signed-in user, whatever the role.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved by the route guard
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser(claims.clone()));
        }

        match resolve_session(&parts.headers, state) {
            Session::Authenticated(claims) => Ok(AuthUser(claims)),
            Session::Anonymous => {
                warn!(path = %parts.uri.path(), "unauthenticated request");
                Err((StatusCode::UNAUTHORIZED, "Not signed in".to_string()))
            }
        }
    }
}
