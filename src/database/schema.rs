// 建表与默认数据

use sqlx::{Executor, PgPool};

use super::{Database, DatabaseError, Role, RoleRule, Rule, User};
use crate::auth::password::PasswordHasher;
use crate::database::models::user::DEFAULT_ROLE;
use crate::error::AppError;
use crate::utils::DIGITS;

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

const ID_LEN: usize = 12;

/// 默认规则：(名称, 说明)
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("admin_panel", "Access to the admin panel"),
    ("support_panel", "Access to the support panel"),
    ("user_panel", "Access to the user panel"),
];

/// 默认角色：(名称, 说明, 拥有的规则)
pub const DEFAULT_ROLES: &[(&str, &str, &[&str])] = &[
    (
        "admin",
        "Administrator",
        &["admin_panel", "support_panel", "user_panel"],
    ),
    ("support", "Support staff", &["support_panel", "user_panel"]),
    (DEFAULT_ROLE, "Regular user", &["user_panel"]),
];

/// 演示账号：(邮箱, 密码, 角色)，仅在显式开启时写入
pub const DEMO_USERS: &[(&str, &str, &str)] = &[
    ("admin@example.com", "admin-password", "admin"),
    ("support@example.com", "support-password", "support"),
    ("user@example.com", "user-password", DEFAULT_ROLE),
];

/// 启动时建表，语句均为 IF NOT EXISTS，可重复执行
pub async fn init_models(pool: &PgPool) -> Result<(), DatabaseError> {
    pool.execute(INIT_SQL).await?;
    tracing::info!("Database schema is ready");
    Ok(())
}

/// 写入默认角色、规则及其关联，已存在的记录保持不变
pub async fn seed_permissions(db: &Database) -> Result<(), DatabaseError> {
    for (name, comment) in DEFAULT_RULES {
        if db.rules.get(&name.to_string()).await?.is_none() {
            db.rules.create(Rule::new(name, comment)).await?;
        }
    }

    for (name, comment, rules) in DEFAULT_ROLES {
        if db.roles.get(&name.to_string()).await?.is_none() {
            db.roles.create(Role::new(name, comment)).await?;
        }

        for rule in rules.iter() {
            let guard = db.role_rules.lock().await;
            if db.role_rules.get_by_pair(name, rule).await?.is_some() {
                continue;
            }
            let id = db
                .role_rules
                .generate_unique_field_id(&guard, DIGITS, ID_LEN)
                .await?;
            db.role_rules.create(RoleRule::new(id, name, rule)).await?;
        }
    }

    Ok(())
}

pub async fn fill_database(
    db: &Database,
    hasher: PasswordHasher,
    seed_demo_users: bool,
) -> Result<(), AppError> {
    seed_permissions(db).await?;

    if seed_demo_users {
        for (email, password, role) in DEMO_USERS {
            if db.users.get_by_email(email).await?.is_some() {
                continue;
            }

            let password = password.to_string();
            let password_hash = db
                .users
                .recorder()
                .observe("schema", "fill_database", async move {
                    tokio::task::spawn_blocking(move || hasher.hash_password(&password))
                        .await
                        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
                        .map_err(AppError::from)
                })
                .await?;

            db.users
                .create_with_generated_id(DIGITS, ID_LEN, |id| {
                    User::new(id, email, password_hash, role)
                })
                .await?;
            tracing::info!("Seeded demo user {}", email);
        }
    }

    tracing::info!("Default roles and rules are in place");
    Ok(())
}
