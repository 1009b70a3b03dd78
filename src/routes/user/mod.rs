mod handler;
mod model;

pub use handler::{change_password, delete_account, sign_in, sign_out, sign_up};
pub use model::{PASSWORD_MAX_LEN, PASSWORD_MIN_LEN, UserInfo};
