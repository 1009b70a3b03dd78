use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub role_name: String,
    pub rule_name: String,
}

/// 角色 -> 规则集合
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub permissions: BTreeMap<String, BTreeSet<String>>,
}
