// 密码哈希、校验与旧格式迁移

use bcrypt::{BcryptError, hash, verify};
use sha2::{Digest, Sha256};

/// 旧版摘要长度：SHA-256 的十六进制表示
const LEGACY_DIGEST_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub valid: bool,
    /// 旧格式校验成功时生成的新 bcrypt 哈希，需要写回存储
    pub upgraded_hash: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, BcryptError> {
        hash(password.as_bytes(), self.cost)
    }

    /// 存储的哈希格式错误时返回 false，不报错
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        verify(password.as_bytes(), stored_hash).unwrap_or(false)
    }

    /// 校验密码，旧格式匹配时顺带生成新的哈希
    pub fn migrate_if_legacy(
        &self,
        stored_hash: &str,
        password: &str,
    ) -> Result<PasswordCheck, BcryptError> {
        if !is_legacy_digest(stored_hash) {
            return Ok(PasswordCheck {
                valid: self.verify_password(password, stored_hash),
                upgraded_hash: None,
            });
        }

        if legacy_digest(password) != stored_hash {
            return Ok(PasswordCheck {
                valid: false,
                upgraded_hash: None,
            });
        }

        Ok(PasswordCheck {
            valid: true,
            upgraded_hash: Some(self.hash_password(password)?),
        })
    }
}

/// 恰好 64 个小写十六进制字符
pub fn is_legacy_digest(stored_hash: &str) -> bool {
    stored_hash.len() == LEGACY_DIGEST_LEN
        && stored_hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

pub fn legacy_digest(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}
