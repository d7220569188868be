//! 基础设施层
//!
//! - `persistence`: PostgreSQL 直写后端（手写 SQL）
//! - `orm`: sea-orm 上下文后端（实体映射、事务内写入、可延迟保存）

pub mod db_metrics;
pub mod orm;
pub mod persistence;
pub mod tables;
