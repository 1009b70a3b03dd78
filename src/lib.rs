pub mod auth;
pub mod config;
pub mod database;
pub mod diagnostics;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

use auth::{AccessControl, AccountService, PasswordHasher, SessionRegistry, TokenService};
use config::Config;
use database::Database;
use diagnostics::ExceptionRecorder;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub sessions: SessionRegistry,
    pub access: AccessControl,
    pub accounts: AccountService,
    pub recorder: ExceptionRecorder,
}

impl AppState {
    pub fn new(db: Database, config: Config, recorder: ExceptionRecorder) -> Self {
        let tokens = TokenService::from_config(&config);
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let sessions = SessionRegistry::new(db.sessions.clone());
        let access = AccessControl::new(db.clone());
        let accounts = AccountService::new(
            db.clone(),
            hasher,
            tokens.clone(),
            sessions.clone(),
            recorder.clone(),
        );

        Self {
            db,
            config,
            tokens,
            hasher,
            sessions,
            access,
            accounts,
            recorder,
        }
    }
}
