//! Admin route gate.
//!
//! Every request passes through [`route_guard`]. Paths outside the protected
//! prefix are forwarded untouched without looking at credentials. Inside it,
//! only a session whose role claim is [`PRIVILEGED_ROLE`] gets through;
//! everyone else is sent to the login page with a `callbackUrl` pointing back
//! at the page they asked for.

use axum::{
    extract::{Request, State},
    http::{header::HOST, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::{
    claims::{Claims, Session},
    extractors::resolve_session,
};
use crate::{config::GuardConfig, state::AppState, users::Role};

pub const PRIVILEGED_ROLE: Role = Role::Admin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Path is outside the protected prefix; credentials were never read.
    Bypass,
    /// Protected path, privileged session.
    Allow(Claims),
    /// Protected path without a privileged session; carries the `Location`.
    Redirect(String),
}

impl GuardDecision {
    pub fn is_pass_through(&self) -> bool {
        !matches!(self, GuardDecision::Redirect(_))
    }
}

/// `/admin` and `/admin/...` are protected, `/administrator` is not.
pub fn is_protected(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

pub fn login_redirect(login_path: &str, original_url: &str) -> String {
    let sep = if login_path.contains('?') { '&' } else { '?' };
    format!(
        "{login_path}{sep}callbackUrl={}",
        urlencoding::encode(original_url)
    )
}

/// Pure decision step. `original_url` and `session` are only evaluated for
/// protected paths.
pub fn decide(
    cfg: &GuardConfig,
    path: &str,
    original_url: impl FnOnce() -> String,
    session: impl FnOnce() -> Session,
) -> GuardDecision {
    if !is_protected(&cfg.protected_prefix, path) {
        return GuardDecision::Bypass;
    }
    match session() {
        Session::Authenticated(claims) if claims.role == PRIVILEGED_ROLE => {
            GuardDecision::Allow(claims)
        }
        _ => GuardDecision::Redirect(login_redirect(&cfg.login_path, &original_url())),
    }
}

/// Scheme and host the caller used, or the configured public origin.
pub fn request_origin(headers: &HeaderMap, uri: &Uri, cfg: &GuardConfig) -> Option<String> {
    if let Some(public) = &cfg.public_url {
        return Some(public.clone());
    }
    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        return Some(format!("{scheme}://{authority}"));
    }
    let host = headers.get(HOST).and_then(|h| h.to_str().ok())?;
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    Some(format!("{proto}://{host}"))
}

pub fn original_url(headers: &HeaderMap, uri: &Uri, cfg: &GuardConfig) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match request_origin(headers, uri, cfg) {
        Some(origin) => format!("{origin}{path_and_query}"),
        None => path_and_query.to_string(),
    }
}

pub async fn route_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let cfg = &state.config.guard;
    let decision = {
        let headers = req.headers();
        let uri = req.uri();
        decide(
            cfg,
            uri.path(),
            || original_url(headers, uri, cfg),
            || resolve_session(headers, &state),
        )
    };

    match decision {
        GuardDecision::Bypass => next.run(req).await,
        GuardDecision::Allow(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        GuardDecision::Redirect(location) => {
            debug!(path = %req.uri().path(), %location, "admin route redirected to login");
            Redirect::temporary(&location).into_response()
        }
    }
}
