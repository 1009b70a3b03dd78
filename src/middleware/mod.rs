mod auth;
mod error_handler;
mod rule;

pub use auth::{AuthSession, PUBLIC_PATHS, auth_middleware, is_public_path};
pub use error_handler::log_errors;
pub use rule::{RuleGuard, require_rule};
