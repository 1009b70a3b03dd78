// 认证与授权

pub mod account;
pub mod cookie;
pub mod password;
pub mod rbac;
pub mod session;
pub mod token;

pub use account::{AccountService, SignedIn};
pub use password::PasswordHasher;
pub use rbac::AccessControl;
pub use session::SessionRegistry;
pub use token::{Identity, TokenService};
