use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use super::auth::AuthSession;
use crate::{AppState, error::AppError};

/// 路由级权限守卫：要求当前用户的角色拥有指定规则
#[derive(Clone)]
pub struct RuleGuard {
    pub state: AppState,
    pub rule: &'static str,
}

impl RuleGuard {
    pub fn new(state: AppState, rule: &'static str) -> Self {
        Self { state, rule }
    }
}

pub async fn require_rule(
    State(guard): State<RuleGuard>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(session) = req.extensions().get::<AuthSession>() else {
        return Err(AppError::Unauthenticated("Access token required"));
    };
    let user_id = session.user_id;

    let user = guard.state.db.users.get(&user_id).await?;
    if !guard.state.access.require(user.as_ref(), guard.rule).await? {
        tracing::warn!("User {} lacks rule {}", user_id, guard.rule);
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}
