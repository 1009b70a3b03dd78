// 数据库实体定义

pub mod role;
pub mod role_rule;
pub mod rule;
pub mod session;
pub mod user;

use super::{DatabaseError, FieldValue};

/// 从列值中取出指定类型，类型不符时报错
pub(crate) fn expect_text(
    table: &'static str,
    column: &str,
    value: FieldValue,
) -> Result<String, DatabaseError> {
    match value {
        FieldValue::Text(v) => Ok(v),
        _ => Err(DatabaseError::TypeMismatch {
            table,
            column: column.to_string(),
        }),
    }
}

pub(crate) fn expect_int(
    table: &'static str,
    column: &str,
    value: FieldValue,
) -> Result<i64, DatabaseError> {
    match value {
        FieldValue::Int(v) => Ok(v),
        _ => Err(DatabaseError::TypeMismatch {
            table,
            column: column.to_string(),
        }),
    }
}

pub(crate) fn expect_bool(
    table: &'static str,
    column: &str,
    value: FieldValue,
) -> Result<bool, DatabaseError> {
    match value {
        FieldValue::Bool(v) => Ok(v),
        _ => Err(DatabaseError::TypeMismatch {
            table,
            column: column.to_string(),
        }),
    }
}

pub(crate) fn expect_timestamp(
    table: &'static str,
    column: &str,
    value: FieldValue,
) -> Result<chrono::DateTime<chrono::Utc>, DatabaseError> {
    match value {
        FieldValue::Timestamp(v) => Ok(v),
        _ => Err(DatabaseError::TypeMismatch {
            table,
            column: column.to_string(),
        }),
    }
}

pub(crate) fn unknown_column(table: &'static str, column: &str) -> DatabaseError {
    DatabaseError::UnknownColumn {
        table,
        column: column.to_string(),
    }
}
