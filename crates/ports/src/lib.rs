//! ports - 抽象 trait 层
//!
//! 定义仓储层依赖的外部协作者接口

mod connection;
mod unit_of_work;

pub use connection::*;
pub use unit_of_work::*;
