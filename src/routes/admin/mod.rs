mod handler;
mod model;

pub use handler::{
    create_role,
    create_rule,
    delete_role,
    delete_rule,
    grant_rule,
    list_role_rules,
    list_roles,
    list_rules,
    permissions,
    revoke_rule,
};
