mod handler;

pub use handler::{admin_panel, support_panel, user_panel};

pub const ADMIN_PANEL_RULE: &str = "admin_panel";
pub const SUPPORT_PANEL_RULE: &str = "support_panel";
pub const USER_PANEL_RULE: &str = "user_panel";
