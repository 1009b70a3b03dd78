use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use rbac_backend::{
    AppState,
    auth::{PasswordHasher, password::legacy_digest},
    config::{Config, DEFAULT_ISSUER, DEFAULT_JWT_EXPIRATION_SECS},
    database::{Database, User, schema::fill_database},
    diagnostics::ExceptionRecorder,
    routes,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_issuer: DEFAULT_ISSUER.to_string(),
        jwt_expiration_secs: DEFAULT_JWT_EXPIRATION_SECS,
        bcrypt_cost: 4,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        exceptions_dir: std::env::temp_dir().join("rbac-backend-it-exceptions"),
        seed_demo_users: false,
    }
}

async fn setup() -> (AppState, Router) {
    setup_with(test_config()).await
}

async fn setup_with(config: Config) -> (AppState, Router) {
    let recorder = ExceptionRecorder::new(config.exceptions_dir.clone());
    let db = Database::in_memory(recorder.clone());
    fill_database(&db, PasswordHasher::new(4), false).await.unwrap();

    let state = AppState::new(db, config, recorder);
    let app = routes::router(state.clone());
    (state, app)
}

fn post(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("access_token={}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("access_token={}", token))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

/// Set-Cookie 中的 access_token 值，清除时为空串
fn cookie_value(response: &Response<Body>) -> Option<String> {
    let header = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = header.split(';').next()?;
    pair.strip_prefix("access_token=").map(str::to_string)
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 注册并返回 (用户 id, 令牌)
async fn sign_up(app: &Router, email: &str, password: &str) -> (i64, String) {
    let response = send(
        app,
        post(
            "/users/sign-up",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let token = cookie_value(&response).unwrap();
    assert!(!token.is_empty());

    let body = body_json(response).await;
    (body["resp_data"]["id"].as_i64().unwrap(), token)
}

async fn sign_in(app: &Router, email: &str, password: &str) -> Response<Body> {
    send(
        app,
        post(
            "/users/sign-in",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await
}

#[tokio::test]
async fn hashing_failure_returns_500_and_is_recorded() {
    let dir = std::env::temp_dir().join(format!("rbac-it-hash-{}", uuid::Uuid::new_v4()));
    let config = Config {
        bcrypt_cost: 40,
        exceptions_dir: dir.clone(),
        ..test_config()
    };
    let (_, app) = setup_with(config).await;

    let response = send(
        &app,
        post(
            "/users/sign-up",
            json!({ "email": "a@example.com", "password": "password123" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn ping_is_public() {
    let (_, app) = setup().await;
    let response = send(
        &app,
        Request::builder().uri("/ping").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn new_user_reaches_user_panel_only() {
    let (_, app) = setup().await;
    let (_, token) = sign_up(&app, "a@example.com", "password123").await;

    let response = send(&app, post("/user-panel/", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["resp_data"]["success"], true);

    let response = send(&app, post("/admin-panel/", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = send(&app, post("/support-panel", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_cookie_is_rejected() {
    let (_, app) = setup().await;

    let response = send(&app, post("/user-panel/", json!({}), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_token_is_rejected_and_cleared() {
    let (_, app) = setup().await;

    let response = send(&app, post("/user-panel/", json!({}), Some("garbage"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(cookie_value(&response).as_deref(), Some(""));
}

#[tokio::test]
async fn expired_token_is_rejected_even_with_session() {
    let (state, app) = setup().await;
    let (user_id, _) = sign_up(&app, "a@example.com", "password123").await;

    let issued = chrono::Utc::now() - chrono::Duration::days(8);
    let stale = state.tokens.issue_at(user_id, issued).unwrap();
    state.sessions.create(user_id, &stale).await.unwrap();

    let response = send(&app, post("/user-panel/", json!({}), Some(&stale))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_out_token_cannot_be_reused() {
    let (_, app) = setup().await;
    let (_, token) = sign_up(&app, "a@example.com", "password123").await;

    let response = send(&app, post("/users/sign-out", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cookie_value(&response).as_deref(), Some(""));

    let response = send(&app, post("/user-panel/", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_revokes_other_sessions() {
    let (_, app) = setup().await;
    let (_, first) = sign_up(&app, "a@example.com", "password123").await;

    let response = sign_in(&app, "a@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = cookie_value(&response).unwrap();
    assert_ne!(first, second);

    let response = send(
        &app,
        post(
            "/users/change-password",
            json!({ "old_password": "wrong-password", "new_password": "newpassword1" }),
            Some(&second),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        post(
            "/users/change-password",
            json!({ "old_password": "password123", "new_password": "newpassword1" }),
            Some(&second),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, post("/user-panel/", json!({}), Some(&first))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = send(&app, post("/user-panel/", json!({}), Some(&second))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = sign_in(&app, "a@example.com", "newpassword1").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleted_account_loses_access() {
    let (state, app) = setup().await;
    let (user_id, token) = sign_up(&app, "a@example.com", "password123").await;

    let response = send(&app, post("/users/delete-account", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, post("/user-panel/", json!({}), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = sign_in(&app, "a@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stored = state.db.users.get(&user_id).await.unwrap().unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn legacy_password_is_migrated_on_sign_in() {
    let (state, app) = setup().await;
    state
        .db
        .users
        .create(User::new(
            555555555555,
            "legacy@example.com",
            legacy_digest("password123"),
            "user",
        ))
        .await
        .unwrap();

    let response = sign_in(&app, "legacy@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_value(&response).is_some());

    let stored = state.db.users.get(&555555555555).await.unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$2"));
}

#[tokio::test]
async fn sign_up_validation_and_duplicates() {
    let (_, app) = setup().await;

    let response = send(
        &app,
        post(
            "/users/sign-up",
            json!({ "email": "a@example.com", "password": "short" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(
        &app,
        post(
            "/users/sign-up",
            json!({ "email": "not-an-email", "password": "password123" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    sign_up(&app, "a@example.com", "password123").await;
    let response = send(
        &app,
        post(
            "/users/sign-up",
            json!({ "email": "a@example.com", "password": "password456" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_manages_roles_and_rules() {
    let (state, app) = setup().await;
    let (admin_id, admin_token) = sign_up(&app, "admin@example.com", "password123").await;
    let (_, user_token) = sign_up(&app, "user@example.com", "password123").await;
    state
        .db
        .users
        .update(&admin_id, vec![("role", "admin".into())])
        .await
        .unwrap();

    // 非管理员无权访问管理接口
    let response = send(&app, request("GET", "/admin-panel/roles", &user_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, post("/admin-panel/", json!({}), Some(&admin_token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, request("GET", "/admin-panel/roles", &admin_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["resp_data"].as_array().unwrap().len(),
        3
    );

    // 新规则授予普通用户后立即生效
    let response = send(
        &app,
        post(
            "/admin-panel/rules",
            json!({ "name": "support_panel_preview", "comment": "Preview" }),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &app,
        post(
            "/admin-panel/role-rules",
            json!({ "role_name": "user", "rule_name": "support_panel" }),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let grant_id = body_json(response).await["resp_data"]["id"].as_i64().unwrap();

    let response = send(&app, post("/support-panel/", json!({}), Some(&user_token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        post(
            "/admin-panel/role-rules",
            json!({ "role_name": "user", "rule_name": "support_panel" }),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request(
            "DELETE",
            &format!("/admin-panel/role-rules/{}", grant_id),
            &admin_token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, post("/support-panel/", json!({}), Some(&user_token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // 仍被用户引用的角色不能删除
    let response = send(&app, request("DELETE", "/admin-panel/roles/user", &admin_token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request("DELETE", "/admin-panel/rules/support_panel_preview", &admin_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        request("DELETE", "/admin-panel/rules/support_panel_preview", &admin_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
