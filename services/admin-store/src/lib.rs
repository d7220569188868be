//! IdentityServer 管理端持久化层
//!
//! Client / ApiResource / IdentityResource 聚合的读取、事务写入、克隆与分页查询，
//! 以及持久化授权与日志的查询。提供手写 SQL 与 sea-orm 两种后端。

pub mod domain;
pub mod infrastructure;
