//! Unit of Work trait 定义

use async_trait::async_trait;
use ids_errors::RepoResult;

/// Unit of Work trait
///
/// 直写型仓储（每次调用即提交）不支持 `save_all_changes`，应返回
/// `RepositoryError::Unimplemented`。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 写操作是否立即提交
    fn auto_save_changes(&self) -> bool;

    /// 提交所有挂起的更改，返回提交的写操作数量
    async fn save_all_changes(&self) -> RepoResult<usize>;
}
