use async_trait::async_trait;
use ids_common::{PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;

use super::persisted_grant::{PersistedGrant, PersistedGrantSubject};

/// 持久化授权仓储接口
#[async_trait]
pub trait PersistedGrantRepository: UnitOfWork {
    /// 拥有授权的主体分页，按 subject_id 子串过滤并排序
    async fn get_persisted_grants_by_users(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<PersistedGrantSubject>>;

    /// 某个主体的授权分页，按创建时间倒序
    async fn get_persisted_grants_by_user(
        &self,
        subject_id: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<PersistedGrant>>;

    async fn get_persisted_grant(&self, key: &str) -> RepoResult<Option<PersistedGrant>>;

    async fn delete_persisted_grant(&self, key: &str) -> RepoResult<u64>;

    async fn delete_persisted_grants(&self, subject_id: &str) -> RepoResult<u64>;

    async fn exists_persisted_grants(&self, subject_id: &str) -> RepoResult<bool>;
}
