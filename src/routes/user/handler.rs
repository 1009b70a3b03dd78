use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::cookie::{auth_cookie, removal_cookie},
    error::AppError,
    middleware::AuthSession,
    routes::SuccessResponse,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{ChangePasswordRequest, SignInRequest, SignUpRequest, UserInfo};

#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<UserInfo>>), AppError> {
    req.validate()?;

    let signed = state.accounts.sign_up(&req.email, &req.password).await?;
    let jar = jar.add(auth_cookie(signed.access_token, state.tokens.ttl()));

    Ok((
        StatusCode::CREATED,
        jar,
        success_to_api_response(UserInfo::from(signed.user)),
    ))
}

#[axum::debug_handler]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserInfo>>), AppError> {
    req.validate()?;

    let signed = state.accounts.sign_in(&req.email, &req.password).await?;
    let jar = jar.add(auth_cookie(signed.access_token, state.tokens.ttl()));

    Ok((jar, success_to_api_response(UserInfo::from(signed.user))))
}

#[axum::debug_handler]
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<SuccessResponse>>), AppError> {
    state
        .accounts
        .sign_out(session.user_id, &session.access_token)
        .await?;

    Ok((jar.add(removal_cookie()), SuccessResponse::ok()))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<SuccessResponse>>, AppError> {
    req.validate()?;

    state
        .accounts
        .change_password(
            session.user_id,
            &session.access_token,
            &req.old_password,
            &req.new_password,
        )
        .await?;

    Ok(SuccessResponse::ok())
}

#[axum::debug_handler]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<SuccessResponse>>), AppError> {
    state.accounts.deactivate(session.user_id).await?;

    Ok((jar.add(removal_cookie()), SuccessResponse::ok()))
}
