use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiration_secs: u64,
    pub bcrypt_cost: u32,
    pub server_host: String,
    pub server_port: u16,
    pub exceptions_dir: PathBuf,
    pub seed_demo_users: bool,
}

pub const DEFAULT_ISSUER: &str = "cryptoside.tech";
/// 令牌默认有效期：7 天
pub const DEFAULT_JWT_EXPIRATION_SECS: u64 = 60 * 60 * 24 * 7;

/// 令牌有效期上限：10 年
pub const MAX_JWT_EXPIRATION_SECS: u64 = 60 * 60 * 24 * 365 * 10;

/// JWT_EXPIRATION 以小时为单位，例如 "168h"
///
/// 无法解析、为 0、溢出或超过上限时使用默认值。
pub fn parse_expiration_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().trim_end_matches('h').parse::<u64>().ok())
        .and_then(|hours| hours.checked_mul(3600))
        .filter(|secs| (1..=MAX_JWT_EXPIRATION_SECS).contains(secs))
        .unwrap_or(DEFAULT_JWT_EXPIRATION_SECS)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration_secs =
            parse_expiration_secs(env::var("JWT_EXPIRATION").ok().as_deref());

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            jwt_expiration_secs,
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            exceptions_dir: env::var("EXCEPTIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets/exceptions")),
            seed_demo_users: env::var("SEED_DEMO_USERS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_is_read_in_hours() {
        assert_eq!(parse_expiration_secs(Some("168h")), 604800);
        assert_eq!(parse_expiration_secs(Some("1")), 3600);
    }

    #[test]
    fn bad_expiration_falls_back_to_default() {
        assert_eq!(parse_expiration_secs(None), DEFAULT_JWT_EXPIRATION_SECS);
        assert_eq!(parse_expiration_secs(Some("soon")), DEFAULT_JWT_EXPIRATION_SECS);
        assert_eq!(parse_expiration_secs(Some("0h")), DEFAULT_JWT_EXPIRATION_SECS);
        assert_eq!(
            parse_expiration_secs(Some(&format!("{}h", u64::MAX))),
            DEFAULT_JWT_EXPIRATION_SECS
        );
        assert_eq!(
            parse_expiration_secs(Some("100000000h")),
            DEFAULT_JWT_EXPIRATION_SECS
        );
    }
}
