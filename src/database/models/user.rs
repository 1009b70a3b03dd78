use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{expect_bool, expect_int, expect_text, expect_timestamp, unknown_column};
use crate::database::{DatabaseError, Entity, FieldValue};

/// 新用户的默认角色
pub const DEFAULT_ROLE: &str = "user";

/// 用户数据库实体
///
/// 账号从不物理删除，注销时只把 `is_active` 置为 false。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// bcrypt 哈希，或尚未迁移的旧版 SHA-256 十六进制摘要
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: i64, email: &str, password_hash: String, role: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            password_hash,
            role: role.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

impl Entity for User {
    type Id = i64;

    const TABLE: &'static str = "users";
    const ID_COLUMN: &'static str = "id";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["id"], &["email"]];

    fn id(&self) -> i64 {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("id", self.id.into()),
            ("email", (&self.email).into()),
            ("password_hash", (&self.password_hash).into()),
            ("role", (&self.role).into()),
            ("is_active", self.is_active.into()),
            ("created_at", self.created_at.into()),
        ]
    }

    fn set_field(&mut self, column: &str, value: FieldValue) -> Result<(), DatabaseError> {
        match column {
            "id" => self.id = expect_int(Self::TABLE, column, value)?,
            "email" => self.email = expect_text(Self::TABLE, column, value)?,
            "password_hash" => self.password_hash = expect_text(Self::TABLE, column, value)?,
            "role" => self.role = expect_text(Self::TABLE, column, value)?,
            "is_active" => self.is_active = expect_bool(Self::TABLE, column, value)?,
            "created_at" => self.created_at = expect_timestamp(Self::TABLE, column, value)?,
            _ => return Err(unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}
