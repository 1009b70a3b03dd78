// 数据库模块
// 通用仓储接口：实体类型和主键类型作为泛型参数，每种实体实例化一次

pub mod models;
pub mod operations;
pub mod schema;

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

use crate::diagnostics::ExceptionRecorder;
use crate::utils::random_string;

pub use models::{role::Role, role_rule::RoleRule, rule::Rule, session::Session, user::User};
pub use operations::{memory::MemoryRepository, postgres::PgRepository};

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("unique constraint violated on {table}: {key}")]
    UniqueViolation { table: &'static str, key: String },
    #[error("unknown column {column} on {table}")]
    UnknownColumn { table: &'static str, column: String },
    #[error("type mismatch for column {column} on {table}")]
    TypeMismatch { table: &'static str, column: String },
    #[error("could not generate a free id for {0}")]
    IdSpaceExhausted(&'static str),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// 列值，用于过滤条件、部分更新以及内存实现中的字段比较
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

#[derive(Debug, Clone)]
pub enum Filter {
    Eq(&'static str, FieldValue),
    Ne(&'static str, FieldValue),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<FieldValue>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn ne(column: &'static str, value: impl Into<FieldValue>) -> Self {
        Filter::Ne(column, value.into())
    }

    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _) | Filter::Ne(c, _) => c,
        }
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Filter::Eq(column, value) => entity.field(column).as_ref() == Some(value),
            Filter::Ne(column, value) => entity.field(column).as_ref() != Some(value),
        }
    }
}

/// 持久化实体
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + PartialEq + Send + Sync + Display + FromStr + Into<FieldValue>;

    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    /// 唯一键，每一组列的组合在表内唯一
    const UNIQUE_KEYS: &'static [&'static [&'static str]];

    fn id(&self) -> Self::Id;

    /// 所有列及其值，顺序即插入顺序
    fn columns(&self) -> Vec<(&'static str, FieldValue)>;

    fn set_field(&mut self, column: &str, value: FieldValue) -> Result<(), DatabaseError>;

    fn field(&self, column: &str) -> Option<FieldValue> {
        self.columns()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// 部分更新的列集合
pub type Changes = Vec<(&'static str, FieldValue)>;

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn create(&self, entity: E) -> Result<E, DatabaseError>;
    async fn get(&self, id: &E::Id) -> Result<Option<E>, DatabaseError>;
    async fn update(&self, id: &E::Id, changes: Changes) -> Result<Option<E>, DatabaseError>;
    async fn delete(&self, id: &E::Id) -> Result<bool, DatabaseError>;
    async fn get_all(&self) -> Result<Vec<E>, DatabaseError>;
    async fn get_all_with_filters(&self, filters: &[Filter]) -> Result<Vec<E>, DatabaseError>;
    async fn delete_with_filters(&self, filters: &[Filter]) -> Result<u64, DatabaseError>;
}

/// 单个实体的数据访问入口
///
/// 持有该实体的仓储实现和一把串行化锁。锁只用于减少并发生成 id 时的重试，
/// 唯一约束仍由存储层保证。
pub struct Table<E: Entity> {
    repo: Arc<dyn Repository<E>>,
    lock: Arc<Mutex<()>>,
    recorder: ExceptionRecorder,
}

impl<E: Entity> Clone for Table<E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            lock: self.lock.clone(),
            recorder: self.recorder.clone(),
        }
    }
}

const ID_GENERATION_ATTEMPTS: usize = 64;

impl<E: Entity> Table<E> {
    pub fn new(repo: Arc<dyn Repository<E>>, recorder: ExceptionRecorder) -> Self {
        Self {
            repo,
            lock: Arc::new(Mutex::new(())),
            recorder,
        }
    }

    pub fn recorder(&self) -> &ExceptionRecorder {
        &self.recorder
    }

    /// 获取该实体的串行化锁
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub async fn create(&self, entity: E) -> Result<E, DatabaseError> {
        self.recorder
            .observe(E::TABLE, "create", self.repo.create(entity))
            .await
    }

    pub async fn get(&self, id: &E::Id) -> Result<Option<E>, DatabaseError> {
        self.recorder.observe(E::TABLE, "get", self.repo.get(id)).await
    }

    pub async fn update(&self, id: &E::Id, changes: Changes) -> Result<Option<E>, DatabaseError> {
        self.recorder
            .observe(E::TABLE, "update", self.repo.update(id, changes))
            .await
    }

    pub async fn delete(&self, id: &E::Id) -> Result<bool, DatabaseError> {
        self.recorder
            .observe(E::TABLE, "delete", self.repo.delete(id))
            .await
    }

    pub async fn get_all(&self) -> Result<Vec<E>, DatabaseError> {
        self.recorder
            .observe(E::TABLE, "get_all", self.repo.get_all())
            .await
    }

    pub async fn get_all_with_filters(&self, filters: &[Filter]) -> Result<Vec<E>, DatabaseError> {
        self.recorder
            .observe(
                E::TABLE,
                "get_all_with_filters",
                self.repo.get_all_with_filters(filters),
            )
            .await
    }

    pub async fn first_with_filters(&self, filters: &[Filter]) -> Result<Option<E>, DatabaseError> {
        Ok(self.get_all_with_filters(filters).await?.into_iter().next())
    }

    pub async fn delete_with_filters(&self, filters: &[Filter]) -> Result<u64, DatabaseError> {
        self.recorder
            .observe(
                E::TABLE,
                "delete_with_filters",
                self.repo.delete_with_filters(filters),
            )
            .await
    }

    /// 生成一个未被占用的随机主键
    ///
    /// 调用方必须持有 [`Table::lock`] 返回的锁，并在同一临界区内完成插入。
    /// 解析后再格式化必须与候选串一致，因此数字主键不会出现前导零。
    pub async fn generate_unique_field_id(
        &self,
        _guard: &MutexGuard<'_, ()>,
        alphabet: &str,
        length: usize,
    ) -> Result<E::Id, DatabaseError> {
        for _ in 0..ID_GENERATION_ATTEMPTS {
            let candidate = random_string(alphabet, length);
            let Ok(id) = candidate.parse::<E::Id>() else {
                continue;
            };
            if id.to_string() != candidate {
                continue;
            }
            if self.get(&id).await?.is_none() {
                return Ok(id);
            }
        }
        Err(DatabaseError::IdSpaceExhausted(E::TABLE))
    }

    /// 在锁内生成主键并插入
    pub async fn create_with_generated_id<F>(
        &self,
        alphabet: &str,
        length: usize,
        build: F,
    ) -> Result<E, DatabaseError>
    where
        F: FnOnce(E::Id) -> E + Send,
    {
        let guard = self.lock().await;
        let id = self.generate_unique_field_id(&guard, alphabet, length).await?;
        let created = self.create(build(id)).await;
        drop(guard);
        created
    }
}

/// 全部实体的数据访问入口
#[derive(Clone)]
pub struct Database {
    pub users: Table<User>,
    pub roles: Table<Role>,
    pub rules: Table<Rule>,
    pub role_rules: Table<RoleRule>,
    pub sessions: Table<Session>,
}

impl Database {
    pub fn postgres(pool: PgPool, recorder: ExceptionRecorder) -> Self {
        Self {
            users: Table::new(Arc::new(PgRepository::<User>::new(pool.clone())), recorder.clone()),
            roles: Table::new(Arc::new(PgRepository::<Role>::new(pool.clone())), recorder.clone()),
            rules: Table::new(Arc::new(PgRepository::<Rule>::new(pool.clone())), recorder.clone()),
            role_rules: Table::new(
                Arc::new(PgRepository::<RoleRule>::new(pool.clone())),
                recorder.clone(),
            ),
            sessions: Table::new(Arc::new(PgRepository::<Session>::new(pool)), recorder),
        }
    }

    pub fn in_memory(recorder: ExceptionRecorder) -> Self {
        Self {
            users: Table::new(Arc::new(MemoryRepository::<User>::default()), recorder.clone()),
            roles: Table::new(Arc::new(MemoryRepository::<Role>::default()), recorder.clone()),
            rules: Table::new(Arc::new(MemoryRepository::<Rule>::default()), recorder.clone()),
            role_rules: Table::new(
                Arc::new(MemoryRepository::<RoleRule>::default()),
                recorder.clone(),
            ),
            sessions: Table::new(Arc::new(MemoryRepository::<Session>::default()), recorder),
        }
    }
}
