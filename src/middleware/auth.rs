use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::{Identity, cookie::ACCESS_TOKEN_COOKIE},
    error::AppError,
};

/// 无需登录即可访问的路径
pub const PUBLIC_PATHS: &[&str] = &[
    "/docs",
    "/redoc",
    "/openapi.json",
    "/users/sign-up",
    "/users/sign-in",
    "/ping",
];

/// 通过认证的会话，由认证中间件写入请求扩展
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: i64,
    pub access_token: String,
    pub identity: Identity,
}

pub fn is_public_path(path: &str) -> bool {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };
    PUBLIC_PATHS.contains(&path)
}

/// 从 cookie 中取出令牌，依次校验签名与会话记录
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let Some(access_token) = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Err(AppError::Unauthenticated("Access token required"));
    };

    let Some(identity) = state.tokens.validate(&access_token) else {
        tracing::warn!("Rejected invalid access token for {}", req.uri().path());
        return Err(AppError::Unauthenticated("Invalid or expired access token"));
    };

    if state
        .sessions
        .find(identity.user_id, &access_token)
        .await?
        .is_none()
    {
        tracing::warn!("Rejected revoked session of user {}", identity.user_id);
        return Err(AppError::Unauthenticated("Session is no longer active"));
    }

    req.extensions_mut().insert(AuthSession {
        user_id: identity.user_id,
        access_token,
        identity,
    });

    Ok(next.run(req).await)
}
