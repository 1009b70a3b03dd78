// 用户表专用查询

use crate::database::{DatabaseError, Filter, Table, User};

impl Table<User> {
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.first_with_filters(&[Filter::eq("email", email)]).await
    }

    /// 引用指定角色的用户
    pub async fn get_by_role(&self, role: &str) -> Result<Vec<User>, DatabaseError> {
        self.get_all_with_filters(&[Filter::eq("role", role)]).await
    }
}
