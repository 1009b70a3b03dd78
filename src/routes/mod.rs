pub mod admin;
pub mod panel;
pub mod user;

use std::any::Any;

use axum::{
    Json, Router,
    http::{Method, header::CONTENT_TYPE},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
};

use crate::{
    AppState,
    middleware::{RuleGuard, auth_middleware, log_errors, require_rule},
    utils::{ApiResponse, success_to_api_response},
};

use panel::{ADMIN_PANEL_RULE, SUPPORT_PANEL_RULE, USER_PANEL_RULE};

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<ApiResponse<SuccessResponse>> {
        success_to_api_response(SuccessResponse { success: true })
    }
}

pub async fn ping() -> Json<ApiResponse<&'static str>> {
    success_to_api_response("pong")
}

fn guarded(router: Router<AppState>, state: &AppState, rule: &'static str) -> Router<AppState> {
    router.route_layer(from_fn_with_state(
        RuleGuard::new(state.clone(), rule),
        require_rule,
    ))
}

/// 组装全部路由
pub fn router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/users/sign-up", post(user::sign_up))
        .route("/users/sign-in", post(user::sign_in))
        .route("/users/sign-out", post(user::sign_out))
        .route("/users/change-password", post(user::change_password))
        .route("/users/delete-account", post(user::delete_account));

    // 管理面板及其角色、规则维护接口
    let admin_routes = guarded(
        Router::new()
            .route("/admin-panel", post(panel::admin_panel))
            .route("/admin-panel/", post(panel::admin_panel))
            .route(
                "/admin-panel/roles",
                get(admin::list_roles).post(admin::create_role),
            )
            .route("/admin-panel/roles/{name}", delete(admin::delete_role))
            .route(
                "/admin-panel/rules",
                get(admin::list_rules).post(admin::create_rule),
            )
            .route("/admin-panel/rules/{name}", delete(admin::delete_rule))
            .route(
                "/admin-panel/role-rules",
                get(admin::list_role_rules).post(admin::grant_rule),
            )
            .route("/admin-panel/role-rules/{id}", delete(admin::revoke_rule))
            .route("/admin-panel/permissions", get(admin::permissions)),
        &state,
        ADMIN_PANEL_RULE,
    );

    let support_routes = guarded(
        Router::new()
            .route("/support-panel", post(panel::support_panel))
            .route("/support-panel/", post(panel::support_panel)),
        &state,
        SUPPORT_PANEL_RULE,
    );

    let user_panel_routes = guarded(
        Router::new()
            .route("/user-panel", post(panel::user_panel))
            .route("/user-panel/", post(panel::user_panel)),
        &state,
        USER_PANEL_RULE,
    );

    // 浏览器需要携带 cookie，来源按请求回显
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    let recorder = state.recorder.clone();

    Router::new()
        .route("/ping", get(ping))
        .merge(user_routes)
        .merge(admin_routes)
        .merge(support_routes)
        .merge(user_panel_routes)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn(log_errors))
        .layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| recorder.handle_panic(payload),
        ))
        .layer(cors)
        .with_state(state)
}
