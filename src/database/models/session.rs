use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{expect_int, expect_text, expect_timestamp, unknown_column};
use crate::database::{DatabaseError, Entity, FieldValue};

/// 用户会话，每个签发的令牌对应一条
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: i64, user_id: i64, access_token: &str) -> Self {
        Self {
            id,
            user_id,
            access_token: access_token.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for Session {
    type Id = i64;

    const TABLE: &'static str = "sessions";
    const ID_COLUMN: &'static str = "id";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["id"], &["access_token"]];

    fn id(&self) -> i64 {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("id", self.id.into()),
            ("user_id", self.user_id.into()),
            ("access_token", (&self.access_token).into()),
            ("created_at", self.created_at.into()),
        ]
    }

    fn set_field(&mut self, column: &str, value: FieldValue) -> Result<(), DatabaseError> {
        match column {
            "id" => self.id = expect_int(Self::TABLE, column, value)?,
            "user_id" => self.user_id = expect_int(Self::TABLE, column, value)?,
            "access_token" => self.access_token = expect_text(Self::TABLE, column, value)?,
            "created_at" => self.created_at = expect_timestamp(Self::TABLE, column, value)?,
            _ => return Err(unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}
