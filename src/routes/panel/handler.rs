use axum::extract::{Extension, Json};

use crate::{middleware::AuthSession, routes::SuccessResponse, utils::ApiResponse};

// 权限检查由路由上的规则守卫完成，到这里即已放行

#[axum::debug_handler]
pub async fn admin_panel(
    Extension(session): Extension<AuthSession>,
) -> Json<ApiResponse<SuccessResponse>> {
    tracing::debug!("User {} opened the admin panel", session.user_id);
    SuccessResponse::ok()
}

#[axum::debug_handler]
pub async fn support_panel(
    Extension(session): Extension<AuthSession>,
) -> Json<ApiResponse<SuccessResponse>> {
    tracing::debug!("User {} opened the support panel", session.user_id);
    SuccessResponse::ok()
}

#[axum::debug_handler]
pub async fn user_panel(
    Extension(session): Extension<AuthSession>,
) -> Json<ApiResponse<SuccessResponse>> {
    tracing::debug!("User {} opened the user panel", session.user_id);
    SuccessResponse::ok()
}
