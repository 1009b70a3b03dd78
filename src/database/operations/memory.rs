use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::{Changes, DatabaseError, Entity, Filter, Repository};

/// 进程内存储，用于测试和无数据库运行
///
/// 与 Postgres 实现一样检查实体声明的唯一键。
pub struct MemoryRepository<E> {
    rows: RwLock<Vec<E>>,
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

/// 找出与 `candidate` 冲突的唯一键，`skip` 为正在更新的行
fn find_conflict<E: Entity>(rows: &[E], candidate: &E, skip: Option<&E::Id>) -> Option<String> {
    for key in E::UNIQUE_KEYS {
        let clash = rows
            .iter()
            .filter(|row| skip.is_none_or(|id| row.id() != *id))
            .any(|row| key.iter().all(|column| row.field(column) == candidate.field(column)));
        if clash {
            return Some(key.join(","));
        }
    }
    None
}

fn matches_all<E: Entity>(row: &E, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn create(&self, entity: E) -> Result<E, DatabaseError> {
        let mut rows = self.rows.write().await;
        if let Some(key) = find_conflict(&rows, &entity, None) {
            return Err(DatabaseError::UniqueViolation {
                table: E::TABLE,
                key,
            });
        }
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn get(&self, id: &E::Id) -> Result<Option<E>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id() == *id).cloned())
    }

    async fn update(&self, id: &E::Id, changes: Changes) -> Result<Option<E>, DatabaseError> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|row| row.id() == *id) else {
            return Ok(None);
        };

        let mut updated = rows[index].clone();
        for (column, value) in changes {
            updated.set_field(column, value)?;
        }
        if let Some(key) = find_conflict(&rows, &updated, Some(id)) {
            return Err(DatabaseError::UniqueViolation {
                table: E::TABLE,
                key,
            });
        }

        rows[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: &E::Id) -> Result<bool, DatabaseError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id() != *id);
        Ok(rows.len() < before)
    }

    async fn get_all(&self) -> Result<Vec<E>, DatabaseError> {
        Ok(self.rows.read().await.clone())
    }

    async fn get_all_with_filters(&self, filters: &[Filter]) -> Result<Vec<E>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| matches_all(*row, filters))
            .cloned()
            .collect())
    }

    async fn delete_with_filters(&self, filters: &[Filter]) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| !matches_all(row, filters));
        Ok((before - rows.len()) as u64)
    }
}
