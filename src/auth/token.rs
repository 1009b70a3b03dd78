// 访问令牌的签发与校验

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::{Config, DEFAULT_JWT_EXPIRATION_SECS, MAX_JWT_EXPIRATION_SECS};
use crate::utils::{ALPHANUMERIC, random_string};

/// 会话标识长度
const SESSION_ID_LEN: usize = 16;

/// 令牌载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub jti: String, // 会话随机标识
    pub sub: String, // 用户ID
    pub iat: i64,    // 签发时间
    pub nbf: i64,    // 生效时间
    pub exp: i64,    // 过期时间
    pub iss: String, // 签发方
}

/// 校验通过的令牌身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub session_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str, issuer: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            ttl,
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let secs = config
            .jwt_expiration_secs
            .min(MAX_JWT_EXPIRATION_SECS)
            .try_into()
            .unwrap_or(DEFAULT_JWT_EXPIRATION_SECS as i64);
        Self::new(&config.jwt_secret, &config.jwt_issuer, Duration::seconds(secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let issued_at = now.timestamp();
        let claims = Claims {
            jti: random_string(ALPHANUMERIC, SESSION_ID_LEN),
            sub: user_id.to_string(),
            iat: issued_at,
            nbf: issued_at,
            exp: (now + self.ttl).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// 校验签名、时间窗口、签发方和必需字段
    ///
    /// 任何失败都返回 None，调用方无法区分失败原因。
    pub fn validate(&self, token: &str) -> Option<Identity> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .ok()?
            .claims;

        let user_id = claims.sub.parse::<i64>().ok().filter(|id| *id > 0)?;
        if claims.jti.is_empty() {
            return None;
        }

        Some(Identity {
            user_id,
            session_id: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
