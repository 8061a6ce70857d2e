//! Admin API. Mounted under the protected prefix, so every handler here only
//! runs after the route guard has admitted an ADMIN session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    posts::{assign_image, BackfillError, BackfillOutcome, ImageAssignment, Post},
    state::AppState,
    store::rejection,
    users::{provision::normalize_email, PublicUser, Role},
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/users/:email", get(get_user))
        .route("/admin/posts/:slug", get(get_post))
        .route("/admin/posts/:slug/image", post(set_post_image))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SetImageBody {
    pub image: String,
}

pub async fn dashboard(AuthUser(claims): AuthUser) -> Json<Dashboard> {
    Json(Dashboard {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let email = normalize_email(&email);
    match state.users.find_by_key(&email).await.map_err(rejection)? {
        Some(user) => Ok(Json(PublicUser::from(user))),
        None => Err((StatusCode::NOT_FOUND, "User not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, (StatusCode, String)> {
    match state.posts.find_by_key(&slug).await.map_err(rejection)? {
        Some(post) => Ok(Json(post)),
        None => Err((StatusCode::NOT_FOUND, "Post not found".into())),
    }
}

#[instrument(skip(state, claims, body), fields(admin = %claims.email))]
pub async fn set_post_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(slug): Path<String>,
    Json(body): Json<SetImageBody>,
) -> Result<Json<Post>, (StatusCode, String)> {
    let assignment = ImageAssignment {
        slug,
        image: body.image,
    };
    let outcome = assign_image(
        state.posts.as_ref(),
        &assignment,
        state.config.static_root.as_deref(),
    )
    .await;

    match outcome {
        Ok(BackfillOutcome::Patched(post)) => {
            info!(slug = %post.slug, "featured image updated from admin");
            Ok(Json(post))
        }
        Ok(BackfillOutcome::Missing(slug)) => {
            Err((StatusCode::NOT_FOUND, format!("No post with slug `{slug}`")))
        }
        Err(BackfillError::Store(e)) => Err(rejection(e)),
        Err(e) => {
            warn!(error = %e, "rejected image assignment");
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}
