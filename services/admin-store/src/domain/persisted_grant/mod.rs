//! 持久化授权（由令牌服务写入，管理端只读和删除）

mod persisted_grant;
mod repository;

pub use persisted_grant::*;
pub use repository::PersistedGrantRepository;
