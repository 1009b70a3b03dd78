// 服务端会话登记，令牌与会话记录一一对应

use crate::database::{DatabaseError, Filter, Session, Table};
use crate::utils::DIGITS;

const SESSION_ID_LEN: usize = 12;

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Table<Session>,
}

impl SessionRegistry {
    pub fn new(sessions: Table<Session>) -> Self {
        Self { sessions }
    }

    pub async fn create(&self, user_id: i64, access_token: &str) -> Result<Session, DatabaseError> {
        let session = self
            .sessions
            .create_with_generated_id(DIGITS, SESSION_ID_LEN, |id| {
                Session::new(id, user_id, access_token)
            })
            .await?;

        tracing::debug!("Created session {} for user {}", session.id, user_id);
        Ok(session)
    }

    pub async fn find(
        &self,
        user_id: i64,
        access_token: &str,
    ) -> Result<Option<Session>, DatabaseError> {
        self.sessions
            .first_with_filters(&[
                Filter::eq("user_id", user_id),
                Filter::eq("access_token", access_token),
            ])
            .await
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Session>, DatabaseError> {
        self.sessions
            .get_all_with_filters(&[Filter::eq("user_id", user_id)])
            .await
    }

    /// 登出：只删除当前令牌对应的会话
    pub async fn revoke(&self, user_id: i64, access_token: &str) -> Result<u64, DatabaseError> {
        self.sessions
            .delete_with_filters(&[
                Filter::eq("user_id", user_id),
                Filter::eq("access_token", access_token),
            ])
            .await
    }

    /// 修改密码：保留当前会话，其余全部删除
    pub async fn revoke_all_except(
        &self,
        user_id: i64,
        access_token: &str,
    ) -> Result<u64, DatabaseError> {
        let removed = self
            .sessions
            .delete_with_filters(&[
                Filter::eq("user_id", user_id),
                Filter::ne("access_token", access_token),
            ])
            .await?;

        tracing::info!("Revoked {} other session(s) of user {}", removed, user_id);
        Ok(removed)
    }

    /// 注销账号：删除该用户全部会话
    pub async fn revoke_all(&self, user_id: i64) -> Result<u64, DatabaseError> {
        let removed = self
            .sessions
            .delete_with_filters(&[Filter::eq("user_id", user_id)])
            .await?;

        tracing::info!("Revoked all {} session(s) of user {}", removed, user_id);
        Ok(removed)
    }
}
