// 仓储实现以及各实体的专用查询

pub mod memory;
pub mod postgres;
pub mod role_rule;
pub mod user;
