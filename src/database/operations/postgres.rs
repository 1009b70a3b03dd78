use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgRow};

use crate::database::{Changes, DatabaseError, Entity, FieldValue, Filter, Repository};

/// 按值的实际类型绑定参数
macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        match $value {
            FieldValue::Int(v) => $query.bind(v),
            FieldValue::Text(v) => $query.bind(v),
            FieldValue::Bool(v) => $query.bind(v),
            FieldValue::Timestamp(v) => $query.bind(v),
        }
    };
}

/// 基于 Postgres 的通用仓储
///
/// 表名和列名均来自实体定义中的常量，用户输入只会作为绑定参数出现。
pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

/// 生成 WHERE 子句，占位符从 `first_param` 开始编号
fn where_clause(filters: &[Filter], first_param: usize) -> (String, Vec<FieldValue>) {
    if filters.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut conditions = Vec::with_capacity(filters.len());
    let mut values = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        let param = first_param + i;
        match filter {
            Filter::Eq(column, value) => {
                conditions.push(format!("{} = ${}", column, param));
                values.push(value.clone());
            }
            Filter::Ne(column, value) => {
                conditions.push(format!("{} <> ${}", column, param));
                values.push(value.clone());
            }
        }
    }

    (format!(" WHERE {}", conditions.join(" AND ")), values)
}

fn map_error<E: Entity>(err: sqlx::Error) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DatabaseError::UniqueViolation {
                table: E::TABLE,
                key: db_err.constraint().unwrap_or_default().to_string(),
            }
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl<E> Repository<E> for PgRepository<E>
where
    E: Entity + for<'r> FromRow<'r, PgRow> + Unpin,
{
    async fn create(&self, entity: E) -> Result<E, DatabaseError> {
        let columns = entity.columns();
        let names = columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            E::TABLE,
            names,
            placeholders
        );

        let mut query = sqlx::query_as::<_, E>(&sql);
        for (_, value) in columns {
            query = bind_value!(query, value);
        }

        query.fetch_one(&self.pool).await.map_err(map_error::<E>)
    }

    async fn get(&self, id: &E::Id) -> Result<Option<E>, DatabaseError> {
        let sql = format!("SELECT * FROM {} WHERE {} = $1", E::TABLE, E::ID_COLUMN);
        let id_value: FieldValue = id.clone().into();
        let query = sqlx::query_as::<_, E>(&sql);
        let query = bind_value!(query, id_value);

        query.fetch_optional(&self.pool).await.map_err(map_error::<E>)
    }

    async fn update(&self, id: &E::Id, changes: Changes) -> Result<Option<E>, DatabaseError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let assignments = changes
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ${}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
            E::TABLE,
            assignments,
            E::ID_COLUMN,
            changes.len() + 1
        );

        let mut query = sqlx::query_as::<_, E>(&sql);
        for (_, value) in changes {
            query = bind_value!(query, value);
        }
        let id_value: FieldValue = id.clone().into();
        query = bind_value!(query, id_value);

        query.fetch_optional(&self.pool).await.map_err(map_error::<E>)
    }

    async fn delete(&self, id: &E::Id) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", E::TABLE, E::ID_COLUMN);
        let id_value: FieldValue = id.clone().into();
        let query = sqlx::query(&sql);
        let query = bind_value!(query, id_value);

        let result = query.execute(&self.pool).await.map_err(map_error::<E>)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_all(&self) -> Result<Vec<E>, DatabaseError> {
        self.get_all_with_filters(&[]).await
    }

    async fn get_all_with_filters(&self, filters: &[Filter]) -> Result<Vec<E>, DatabaseError> {
        let (clause, values) = where_clause(filters, 1);
        let sql = format!(
            "SELECT * FROM {}{} ORDER BY created_at",
            E::TABLE,
            clause
        );

        let mut query = sqlx::query_as::<_, E>(&sql);
        for value in values {
            query = bind_value!(query, value);
        }

        query.fetch_all(&self.pool).await.map_err(map_error::<E>)
    }

    async fn delete_with_filters(&self, filters: &[Filter]) -> Result<u64, DatabaseError> {
        let (clause, values) = where_clause(filters, 1);
        let sql = format!("DELETE FROM {}{}", E::TABLE, clause);

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value!(query, value);
        }

        let result = query.execute(&self.pool).await.map_err(map_error::<E>)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_numbers_placeholders_from_offset() {
        let filters = [Filter::eq("user_id", 42_i64), Filter::ne("access_token", "abc")];
        let (clause, values) = where_clause(&filters, 3);

        assert_eq!(clause, " WHERE user_id = $3 AND access_token <> $4");
        assert_eq!(
            values,
            vec![FieldValue::Int(42), FieldValue::Text("abc".to_string())]
        );
    }

    #[test]
    fn empty_filters_produce_no_clause() {
        let (clause, values) = where_clause(&[], 1);
        assert!(clause.is_empty());
        assert!(values.is_empty());
    }
}
