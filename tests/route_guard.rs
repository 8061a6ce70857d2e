use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use time::OffsetDateTime;
use tower::ServiceExt;

use talentsite::{
    app::build_app,
    state::AppState,
    store::Record,
    users::{NewUser, Role, User},
};

fn app() -> (Router, AppState) {
    let state = AppState::fake();
    (build_app(state.clone()), state)
}

fn token_for(state: &AppState, role: Role) -> String {
    let user = User::from_draft(
        NewUser {
            email: format!("{}@example.org", role.as_str().to_lowercase()),
            name: None,
            password_hash: "unused".into(),
            role,
            email_verified: None,
        },
        OffsetDateTime::now_utc(),
    );
    state.jwt.sign(&user).expect("sign")
}

fn get(uri: &str, cookie: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, "localhost:8080");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(res: &axum::response::Response) -> Option<String> {
    res.headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn admin_without_cookie_redirects_to_login_with_callback() {
    let (app, _) = app();
    let res = app.oneshot(get("/admin/dashboard", None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&res).as_deref(),
        Some("/auth/login?callbackUrl=http%3A%2F%2Flocalhost%3A8080%2Fadmin%2Fdashboard")
    );
}

#[tokio::test]
async fn public_path_passes_through_without_cookie() {
    let (app, _) = app();
    let res = app.clone().oneshot(get("/public/home", None)).await.unwrap();
    assert_ne!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&res).is_none());

    let res = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn garbage_cookie_is_treated_as_anonymous() {
    let (app, _) = app();
    let res = app
        .oneshot(get("/admin/dashboard", Some("session-token=not-a-jwt".into())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn editor_and_user_are_redirected() {
    let (app, state) = app();
    for role in [Role::User, Role::Editor] {
        let cookie = format!("session-token={}", token_for(&state, role));
        let res = app
            .clone()
            .oneshot(get("/admin/dashboard", Some(cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "{role}");
    }
}

#[tokio::test]
async fn admin_session_reaches_dashboard() {
    let (app, state) = app();
    let cookie = format!("session-token={}", token_for(&state, Role::Admin));
    let res = app.oneshot(get("/admin/dashboard", Some(cookie))).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["role"], "ADMIN");
    assert_eq!(json["email"], "admin@example.org");
}

#[tokio::test]
async fn unknown_admin_path_is_still_gated() {
    let (app, _) = app();
    let res = app.oneshot(get("/admin/does-not-exist?x=1", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&res)
        .unwrap()
        .ends_with("%2Fadmin%2Fdoes-not-exist%3Fx%3D1"));
}

#[tokio::test]
async fn bearer_header_is_accepted_on_admin_routes() {
    let (app, state) = app();
    let req = Request::builder()
        .uri("/admin/dashboard")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(&state, Role::Admin)))
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
