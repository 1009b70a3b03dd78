// 角色-规则关联表专用查询

use crate::database::{DatabaseError, Filter, RoleRule, Table};

impl Table<RoleRule> {
    pub async fn get_by_role(&self, role_name: &str) -> Result<Vec<RoleRule>, DatabaseError> {
        self.get_all_with_filters(&[Filter::eq("role_name", role_name)])
            .await
    }

    pub async fn get_by_pair(
        &self,
        role_name: &str,
        rule_name: &str,
    ) -> Result<Option<RoleRule>, DatabaseError> {
        self.first_with_filters(&[
            Filter::eq("role_name", role_name),
            Filter::eq("rule_name", rule_name),
        ])
        .await
    }
}
