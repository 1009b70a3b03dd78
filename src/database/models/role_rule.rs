use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{expect_int, expect_text, expect_timestamp, unknown_column};
use crate::database::{DatabaseError, Entity, FieldValue};

/// 角色与规则的多对多关联
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleRule {
    pub id: i64,
    pub role_name: String,
    pub rule_name: String,
    pub created_at: DateTime<Utc>,
}

impl RoleRule {
    pub fn new(id: i64, role_name: &str, rule_name: &str) -> Self {
        Self {
            id,
            role_name: role_name.to_string(),
            rule_name: rule_name.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for RoleRule {
    type Id = i64;

    const TABLE: &'static str = "role_rules";
    const ID_COLUMN: &'static str = "id";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] =
        &[&["id"], &["role_name", "rule_name"]];

    fn id(&self) -> i64 {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("id", self.id.into()),
            ("role_name", (&self.role_name).into()),
            ("rule_name", (&self.rule_name).into()),
            ("created_at", self.created_at.into()),
        ]
    }

    fn set_field(&mut self, column: &str, value: FieldValue) -> Result<(), DatabaseError> {
        match column {
            "id" => self.id = expect_int(Self::TABLE, column, value)?,
            "role_name" => self.role_name = expect_text(Self::TABLE, column, value)?,
            "rule_name" => self.rule_name = expect_text(Self::TABLE, column, value)?,
            "created_at" => self.created_at = expect_timestamp(Self::TABLE, column, value)?,
            _ => return Err(unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}
