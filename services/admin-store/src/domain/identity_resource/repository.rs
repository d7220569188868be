//! IdentityResource 仓储接口

use async_trait::async_trait;
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;

use super::identity_resource::IdentityResource;

/// IdentityResource 仓储接口
#[async_trait]
pub trait IdentityResourceRepository: UnitOfWork {
    /// 按名称子串分页查询根记录，按名称排序
    async fn get_identity_resources(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<IdentityResource>>;

    async fn get_identity_resource(&self, id: EntityId) -> RepoResult<Option<IdentityResource>>;

    async fn identity_resource_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool>;

    async fn can_insert_identity_resource(&self, resource: &IdentityResource) -> RepoResult<bool> {
        let exclude = (resource.id != NEW_ID).then_some(resource.id);
        Ok(!self.identity_resource_name_exists(&resource.name, exclude).await?)
    }

    async fn add_identity_resource(&self, resource: &IdentityResource) -> RepoResult<EntityId>;

    async fn update_identity_resource(&self, resource: &IdentityResource) -> RepoResult<u64>;

    async fn delete_identity_resource(&self, resource: &IdentityResource) -> RepoResult<u64>;
}
