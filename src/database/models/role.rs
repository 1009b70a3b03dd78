use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{expect_text, expect_timestamp, unknown_column};
use crate::database::{DatabaseError, Entity, FieldValue};

/// 角色，以名称为主键
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: &str, comment: &str) -> Self {
        Self {
            name: name.to_string(),
            comment: comment.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for Role {
    type Id = String;

    const TABLE: &'static str = "roles";
    const ID_COLUMN: &'static str = "name";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];

    fn id(&self) -> String {
        self.name.clone()
    }

    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", (&self.name).into()),
            ("comment", (&self.comment).into()),
            ("created_at", self.created_at.into()),
        ]
    }

    fn set_field(&mut self, column: &str, value: FieldValue) -> Result<(), DatabaseError> {
        match column {
            "name" => self.name = expect_text(Self::TABLE, column, value)?,
            "comment" => self.comment = expect_text(Self::TABLE, column, value)?,
            "created_at" => self.created_at = expect_timestamp(Self::TABLE, column, value)?,
            _ => return Err(unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}
