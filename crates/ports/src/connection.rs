//! 连接字符串提供者

use secrecy::Secret;

/// 按名称提供连接字符串，内容对仓储层不透明
pub trait ConnectionStringProvider: Send + Sync {
    fn connection_string(&self, name: &str) -> Option<Secret<String>>;
}
