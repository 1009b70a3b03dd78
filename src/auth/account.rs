// 账号生命周期：注册、登录、登出、改密、注销

use bcrypt::BcryptError;

use super::password::{PasswordCheck, PasswordHasher};
use super::session::SessionRegistry;
use super::token::TokenService;
use crate::database::models::user::DEFAULT_ROLE;
use crate::database::{Database, User};
use crate::diagnostics::ExceptionRecorder;
use crate::error::AppError;
use crate::utils::DIGITS;

const USER_ID_LEN: usize = 12;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// bcrypt 计算量大，放到阻塞线程池执行
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, BcryptError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?;
    Ok(result?)
}

/// 登录成功后的结果：用户与新签发的令牌
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    hasher: PasswordHasher,
    tokens: TokenService,
    sessions: SessionRegistry,
    recorder: ExceptionRecorder,
}

impl AccountService {
    pub fn new(
        db: Database,
        hasher: PasswordHasher,
        tokens: TokenService,
        sessions: SessionRegistry,
        recorder: ExceptionRecorder,
    ) -> Self {
        Self {
            db,
            hasher,
            tokens,
            sessions,
            recorder,
        }
    }

    // 哈希与签名失败同样写入异常记录，再原样返回

    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher;
        let password = password.to_string();
        self.recorder
            .observe(
                "auth",
                "hash_password",
                run_blocking(move || hasher.hash_password(&password)),
            )
            .await
    }

    async fn check(&self, stored_hash: &str, password: &str) -> Result<PasswordCheck, AppError> {
        let hasher = self.hasher;
        let stored_hash = stored_hash.to_string();
        let password = password.to_string();
        self.recorder
            .observe(
                "auth",
                "verify_password",
                run_blocking(move || hasher.migrate_if_legacy(&stored_hash, &password)),
            )
            .await
    }

    /// 签发令牌并登记会话
    async fn open_session(&self, user: User) -> Result<SignedIn, AppError> {
        let tokens = &self.tokens;
        let user_id = user.id;
        let access_token = self
            .recorder
            .observe("auth", "issue_token", async move {
                tokens.issue(user_id).map_err(AppError::from)
            })
            .await?;
        self.sessions.create(user.id, &access_token).await?;
        Ok(SignedIn { user, access_token })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        if self.db.users.get_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .db
            .users
            .create_with_generated_id(DIGITS, USER_ID_LEN, |id| {
                User::new(id, email, password_hash, DEFAULT_ROLE)
            })
            .await?;

        tracing::info!("User {} signed up as {}", user.id, user.email);
        self.open_session(user).await
    }

    /// 登录，顺带把旧版摘要迁移为 bcrypt
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let Some(mut user) = self.db.users.get_by_email(email).await? else {
            tracing::warn!("Sign-in attempt for unknown email {}", email);
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS));
        };

        let check = self.check(&user.password_hash, password).await?;
        if !check.valid {
            tracing::warn!("Wrong password for user {}", user.id);
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS));
        }
        if !user.is_active {
            tracing::warn!("Sign-in attempt for deactivated user {}", user.id);
            return Err(AppError::Unauthenticated("Account is deactivated"));
        }

        if let Some(new_hash) = check.upgraded_hash {
            self.db
                .users
                .update(&user.id, vec![("password_hash", (&new_hash).into())])
                .await?;
            user.password_hash = new_hash;
            tracing::info!("Migrated legacy password hash of user {}", user.id);
        }

        tracing::info!("User {} signed in", user.id);
        self.open_session(user).await
    }

    pub async fn sign_out(&self, user_id: i64, access_token: &str) -> Result<(), AppError> {
        self.sessions.revoke(user_id, access_token).await?;
        tracing::info!("User {} signed out", user_id);
        Ok(())
    }

    /// 修改密码，保留当前会话，吊销其余会话
    pub async fn change_password(
        &self,
        user_id: i64,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let Some(user) = self.db.users.get(&user_id).await? else {
            return Err(AppError::Unauthenticated("User not found"));
        };

        if !self.check(&user.password_hash, old_password).await?.valid {
            return Err(AppError::BadRequest("Wrong old password".to_string()));
        }

        let password_hash = self.hash(new_password).await?;
        self.db
            .users
            .update(&user_id, vec![("password_hash", password_hash.into())])
            .await?;
        self.sessions.revoke_all_except(user_id, access_token).await?;

        tracing::info!("User {} changed password", user_id);
        Ok(())
    }

    /// 注销账号：软删除并吊销全部会话
    pub async fn deactivate(&self, user_id: i64) -> Result<(), AppError> {
        let updated = self
            .db
            .users
            .update(&user_id, vec![("is_active", false.into())])
            .await?;
        if updated.is_none() {
            return Err(AppError::Unauthenticated("User not found"));
        }
        self.sessions.revoke_all(user_id).await?;

        tracing::info!("User {} deactivated", user_id);
        Ok(())
    }
}
