// 角色-规则权限模型
// 每次检查都重新读取关联表，不做缓存

use std::collections::{BTreeMap, BTreeSet};

use crate::database::{Database, DatabaseError, Filter, Role, RoleRule, Rule, User};
use crate::error::AppError;
use crate::utils::DIGITS;

const ROLE_RULE_ID_LEN: usize = 12;

/// 从关联记录中取出某个角色拥有的全部规则
pub fn rules_for_role(role_rules: &[RoleRule], role: &str) -> BTreeSet<String> {
    role_rules
        .iter()
        .filter(|rr| rr.role_name == role)
        .map(|rr| rr.rule_name.clone())
        .collect()
}

/// 按角色聚合全部规则
pub fn rules_by_role(role_rules: &[RoleRule]) -> BTreeMap<String, BTreeSet<String>> {
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for rr in role_rules {
        grouped
            .entry(rr.role_name.clone())
            .or_default()
            .insert(rr.rule_name.clone());
    }
    grouped
}

fn require_name(kind: &str, name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(format!("{} name must not be empty", kind)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccessControl {
    db: Database,
}

impl AccessControl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn rules_for_role(&self, role: &str) -> Result<BTreeSet<String>, DatabaseError> {
        let role_rules = self.db.role_rules.get_by_role(role).await?;
        Ok(rules_for_role(&role_rules, role))
    }

    /// 用户不存在、已停用或其角色没有该规则时返回 false
    pub async fn require(&self, user: Option<&User>, rule: &str) -> Result<bool, DatabaseError> {
        let Some(user) = user else {
            return Ok(false);
        };
        if !user.is_active {
            return Ok(false);
        }
        Ok(self.rules_for_role(&user.role).await?.contains(rule))
    }

    pub async fn permissions(&self) -> Result<BTreeMap<String, BTreeSet<String>>, DatabaseError> {
        Ok(rules_by_role(&self.db.role_rules.get_all().await?))
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, DatabaseError> {
        self.db.roles.get_all().await
    }

    pub async fn create_role(&self, name: &str, comment: &str) -> Result<Role, AppError> {
        require_name("Role", name)?;

        let _guard = self.db.roles.lock().await;
        if self.db.roles.get(&name.to_string()).await?.is_some() {
            return Err(AppError::Conflict(format!("Role {} already exists", name)));
        }
        let role = self.db.roles.create(Role::new(name, comment)).await?;

        tracing::info!("Created role {}", role.name);
        Ok(role)
    }

    /// 仍有用户引用该角色时拒绝删除；角色的关联记录一并删除
    pub async fn delete_role(&self, name: &str) -> Result<(), AppError> {
        let _guard = self.db.roles.lock().await;
        if self.db.roles.get(&name.to_string()).await?.is_none() {
            return Err(AppError::NotFound(format!("Role {} not found", name)));
        }
        if !self.db.users.get_by_role(name).await?.is_empty() {
            return Err(AppError::Conflict(format!(
                "Role {} is still assigned to users",
                name
            )));
        }

        self.db
            .role_rules
            .delete_with_filters(&[Filter::eq("role_name", name)])
            .await?;
        self.db.roles.delete(&name.to_string()).await?;

        tracing::info!("Deleted role {}", name);
        Ok(())
    }

    pub async fn list_rules(&self) -> Result<Vec<Rule>, DatabaseError> {
        self.db.rules.get_all().await
    }

    pub async fn create_rule(&self, name: &str, comment: &str) -> Result<Rule, AppError> {
        require_name("Rule", name)?;

        let _guard = self.db.rules.lock().await;
        if self.db.rules.get(&name.to_string()).await?.is_some() {
            return Err(AppError::Conflict(format!("Rule {} already exists", name)));
        }
        let rule = self.db.rules.create(Rule::new(name, comment)).await?;

        tracing::info!("Created rule {}", rule.name);
        Ok(rule)
    }

    pub async fn delete_rule(&self, name: &str) -> Result<(), AppError> {
        let _guard = self.db.rules.lock().await;
        if self.db.rules.get(&name.to_string()).await?.is_none() {
            return Err(AppError::NotFound(format!("Rule {} not found", name)));
        }

        self.db
            .role_rules
            .delete_with_filters(&[Filter::eq("rule_name", name)])
            .await?;
        self.db.rules.delete(&name.to_string()).await?;

        tracing::info!("Deleted rule {}", name);
        Ok(())
    }

    pub async fn list_role_rules(&self) -> Result<Vec<RoleRule>, DatabaseError> {
        self.db.role_rules.get_all().await
    }

    /// 给角色授予规则
    ///
    /// 加锁顺序固定为 roles -> rules -> role_rules，检查与插入之间角色和规则不会被删除。
    pub async fn grant(&self, role_name: &str, rule_name: &str) -> Result<RoleRule, AppError> {
        let _roles_guard = self.db.roles.lock().await;
        let _rules_guard = self.db.rules.lock().await;

        if self.db.roles.get(&role_name.to_string()).await?.is_none() {
            return Err(AppError::NotFound(format!("Role {} not found", role_name)));
        }
        if self.db.rules.get(&rule_name.to_string()).await?.is_none() {
            return Err(AppError::NotFound(format!("Rule {} not found", rule_name)));
        }

        let table = &self.db.role_rules;
        let guard = table.lock().await;
        if table.get_by_pair(role_name, rule_name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Role {} already has rule {}",
                role_name, rule_name
            )));
        }
        let id = table
            .generate_unique_field_id(&guard, DIGITS, ROLE_RULE_ID_LEN)
            .await?;
        let role_rule = table.create(RoleRule::new(id, role_name, rule_name)).await?;
        drop(guard);

        tracing::info!("Granted rule {} to role {}", rule_name, role_name);
        Ok(role_rule)
    }

    pub async fn revoke_grant(&self, id: i64) -> Result<(), AppError> {
        if !self.db.role_rules.delete(&id).await? {
            return Err(AppError::NotFound(format!("Role rule {} not found", id)));
        }

        tracing::info!("Removed role rule {}", id);
        Ok(())
    }
}
