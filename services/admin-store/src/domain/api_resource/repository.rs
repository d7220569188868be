//! ApiResource 仓储接口

use async_trait::async_trait;
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;

use super::api_resource::{ApiResource, ApiScope, ApiSecret};

/// ApiResource 仓储接口
#[async_trait]
pub trait ApiResourceRepository: UnitOfWork {
    /// 按名称子串分页查询根记录，按名称排序
    async fn get_api_resources(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiResource>>;

    /// 读取完整聚合（声明、密钥、scope 及 scope 声明）
    async fn get_api_resource(&self, id: EntityId) -> RepoResult<Option<ApiResource>>;

    async fn api_resource_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool>;

    async fn can_insert_api_resource(&self, resource: &ApiResource) -> RepoResult<bool> {
        let exclude = (resource.id != NEW_ID).then_some(resource.id);
        Ok(!self.api_resource_name_exists(&resource.name, exclude).await?)
    }

    async fn add_api_resource(&self, resource: &ApiResource) -> RepoResult<EntityId>;

    async fn update_api_resource(&self, resource: &ApiResource) -> RepoResult<u64>;

    async fn delete_api_resource(&self, resource: &ApiResource) -> RepoResult<u64>;

    /// 名称；记录不存在时返回 NotFound
    async fn get_api_resource_name(&self, id: EntityId) -> RepoResult<String>;

    /// 某个 ApiResource 下的 scope 分页（不含 scope 声明），按名称排序
    async fn get_api_scopes(
        &self,
        api_resource_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiScope>>;

    /// 读取 scope 及其声明
    async fn get_api_scope(&self, api_resource_id: EntityId, scope_id: EntityId) -> RepoResult<Option<ApiScope>>;

    async fn api_scope_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool>;

    async fn can_insert_api_scope(&self, scope: &ApiScope) -> RepoResult<bool> {
        let exclude = (scope.id != NEW_ID).then_some(scope.id);
        Ok(!self.api_scope_name_exists(&scope.name, exclude).await?)
    }

    /// 插入 scope 及其声明；父记录不存在时返回 `0`
    async fn add_api_scope(&self, api_resource_id: EntityId, scope: &ApiScope) -> RepoResult<EntityId>;

    /// 更新 scope 并全量替换其声明，返回 scope 影响行数
    async fn update_api_scope(&self, api_resource_id: EntityId, scope: &ApiScope) -> RepoResult<u64>;

    async fn delete_api_scope(&self, scope: &ApiScope) -> RepoResult<u64>;

    async fn get_api_secrets(
        &self,
        api_resource_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiSecret>>;

    async fn get_api_secret(&self, secret_id: EntityId) -> RepoResult<Option<ApiSecret>>;

    async fn add_api_secret(&self, api_resource_id: EntityId, secret: &ApiSecret) -> RepoResult<EntityId>;

    async fn delete_api_secret(&self, secret: &ApiSecret) -> RepoResult<u64>;
}
