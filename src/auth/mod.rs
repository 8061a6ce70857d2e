use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use claims::{Claims, Session};
pub use dto::{LoginPage, LoginRequest, LoginResponse, SessionResponse};
pub use guard::{route_guard, GuardDecision, PRIVILEGED_ROLE};
pub use jwt::JwtKeys;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
