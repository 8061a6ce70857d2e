use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{error, info, instrument, warn};

use super::{
    claims::Session,
    dto::{CallbackQuery, LoginPage, LoginRequest, LoginResponse, SessionResponse},
    extractors::{resolve_session, AuthUser},
    guard::request_origin,
    password::verify_password,
};
use crate::{
    state::AppState,
    store::rejection,
    users::{
        provision::{is_valid_email, normalize_email},
        PublicUser,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Keep callbacks on this site: relative paths, or absolute URLs on our own
/// origin. Anything else lands on `/`.
pub fn sanitize_callback(candidate: Option<&str>, origin: Option<&str>) -> String {
    let Some(url) = candidate.map(str::trim).filter(|u| !u.is_empty()) else {
        return "/".into();
    };
    if url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\") {
        return url.to_string();
    }
    if let Some(origin) = origin {
        let rest = url.strip_prefix(origin);
        if matches!(rest, Some(r) if r.is_empty() || r.starts_with('/') || r.starts_with('?')) {
            return url.to_string();
        }
    }
    "/".into()
}

fn callback_origin(headers: &HeaderMap, state: &AppState) -> Option<String> {
    let uri = axum::http::Uri::from_static("/");
    request_origin(headers, &uri, &state.config.guard)
}

pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<CallbackQuery>,
) -> Json<LoginPage> {
    let origin = callback_origin(&headers, &state);
    Json(LoginPage {
        callback_url: sanitize_callback(q.callback_url.as_deref(), origin.as_deref()),
    })
}

#[instrument(skip(state, headers, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), (StatusCode, String)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match state.users.find_by_key(&payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(rejection(e)),
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let token = match state.jwt.sign(&user) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "session token signing failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let session_cfg = &state.config.session;
    let cookie = Cookie::build((session_cfg.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session_cfg.secure)
        .max_age(time::Duration::minutes(state.config.jwt.ttl_minutes))
        .build();

    let origin = callback_origin(&headers, &state);
    let redirect_to = sanitize_callback(payload.callback_url.as_deref(), origin.as_deref());

    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user: PublicUser::from(user),
            redirect_to,
        }),
    ))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let cookie = Cookie::build((state.config.session.cookie_name.clone(), "")).path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionResponse> {
    let body = match resolve_session(&headers, &state) {
        Session::Authenticated(claims) => SessionResponse {
            authenticated: true,
            email: Some(claims.email),
            role: Some(claims.role),
            expires: Some(claims.exp),
        },
        Session::Anonymous => SessionResponse {
            authenticated: false,
            email: None,
            role: None,
            expires: None,
        },
    };
    Json(body)
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state
        .users
        .find_by_key(&claims.email)
        .await
        .map_err(rejection)?
        .ok_or_else(|| {
            error!(email = %claims.email, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(PublicUser::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_callbacks_are_kept() {
        assert_eq!(sanitize_callback(Some("/admin/dashboard"), None), "/admin/dashboard");
        assert_eq!(sanitize_callback(Some("/admin?x=1"), None), "/admin?x=1");
    }

    #[test]
    fn foreign_or_protocol_relative_callbacks_fall_back_to_root() {
        assert_eq!(sanitize_callback(Some("https://evil.example/phish"), None), "/");
        assert_eq!(sanitize_callback(Some("//evil.example"), None), "/");
        assert_eq!(
            sanitize_callback(Some("http://localhost:8080.evil/x"), Some("http://localhost:8080")),
            "/"
        );
        assert_eq!(sanitize_callback(None, None), "/");
        assert_eq!(sanitize_callback(Some("  "), None), "/");
    }

    #[test]
    fn same_origin_absolute_callbacks_are_kept() {
        let origin = Some("http://localhost:8080");
        assert_eq!(
            sanitize_callback(Some("http://localhost:8080/admin/dashboard"), origin),
            "http://localhost:8080/admin/dashboard"
        );
    }

    #[test]
    fn session_response_omits_empty_fields() {
        let json = serde_json::to_string(&SessionResponse {
            authenticated: false,
            email: None,
            role: None,
            expires: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"authenticated":false}"#);
    }
}
