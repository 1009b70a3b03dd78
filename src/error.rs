use axum::{
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};

use crate::auth::cookie::removal_cookie;
use crate::database::DatabaseError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 缺少、无效、过期或已吊销的令牌，以及错误的登录凭据
    #[error("{0}")]
    Unauthenticated(&'static str),
    /// 身份有效但缺少权限
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, i32, String) {
        match self {
            AppError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg.to_string())
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                error_codes::PERMISSION_DENIED,
                "Forbidden".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, error_codes::CONFLICT, msg.clone()),
            AppError::Database(DatabaseError::UniqueViolation { table, .. }) => (
                StatusCode::BAD_REQUEST,
                error_codes::CONFLICT,
                format!("Record already exists in {}", table),
            ),
            AppError::NotFound(msg) => (StatusCode::BAD_REQUEST, error_codes::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST, msg.clone())
            }
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                error_codes::VALIDATION_ERROR,
                msg.clone(),
            ),
            AppError::Database(_)
            | AppError::Hash(_)
            | AppError::Token(_)
            | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = self.parts();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut response = (status, error_to_api_response::<()>(code, msg)).into_response();

        // 401 一律清除客户端的令牌 cookie
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(value) = HeaderValue::from_str(&removal_cookie().to_string()) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_clears_cookie() {
        let response = AppError::Unauthenticated("Access token required").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("access_token="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn forbidden_keeps_cookie() {
        let response = AppError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn conflicts_and_missing_records_are_bad_requests() {
        assert_eq!(
            AppError::Conflict("dup".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("gone".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        let unique = AppError::Database(DatabaseError::UniqueViolation {
            table: "users",
            key: "email".into(),
        });
        assert_eq!(unique.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_are_server_errors() {
        let err = AppError::Database(DatabaseError::IdSpaceExhausted("sessions"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
