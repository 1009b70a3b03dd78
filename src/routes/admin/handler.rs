use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    database::{Role, RoleRule, Rule},
    error::AppError,
    routes::SuccessResponse,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{CreateRoleRequest, CreateRuleRequest, GrantRequest, PermissionsResponse};

#[axum::debug_handler]
pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Role>>>, AppError> {
    Ok(success_to_api_response(state.access.list_roles().await?))
}

#[axum::debug_handler]
pub async fn create_role(
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Role>>), AppError> {
    let role = state.access.create_role(&req.name, &req.comment).await?;
    Ok((StatusCode::CREATED, success_to_api_response(role)))
}

#[axum::debug_handler]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<SuccessResponse>>, AppError> {
    state.access.delete_role(&name).await?;
    Ok(SuccessResponse::ok())
}

#[axum::debug_handler]
pub async fn list_rules(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Rule>>>, AppError> {
    Ok(success_to_api_response(state.access.list_rules().await?))
}

#[axum::debug_handler]
pub async fn create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Rule>>), AppError> {
    let rule = state.access.create_rule(&req.name, &req.comment).await?;
    Ok((StatusCode::CREATED, success_to_api_response(rule)))
}

#[axum::debug_handler]
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<SuccessResponse>>, AppError> {
    state.access.delete_rule(&name).await?;
    Ok(SuccessResponse::ok())
}

#[axum::debug_handler]
pub async fn list_role_rules(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RoleRule>>>, AppError> {
    Ok(success_to_api_response(state.access.list_role_rules().await?))
}

#[axum::debug_handler]
pub async fn grant_rule(
    State(state): State<AppState>,
    Json(req): Json<GrantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoleRule>>), AppError> {
    let role_rule = state.access.grant(&req.role_name, &req.rule_name).await?;
    Ok((StatusCode::CREATED, success_to_api_response(role_rule)))
}

#[axum::debug_handler]
pub async fn revoke_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SuccessResponse>>, AppError> {
    state.access.revoke_grant(id).await?;
    Ok(SuccessResponse::ok())
}

#[axum::debug_handler]
pub async fn permissions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PermissionsResponse>>, AppError> {
    let permissions = state.access.permissions().await?;
    Ok(success_to_api_response(PermissionsResponse { permissions }))
}
