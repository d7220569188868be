//! Client 仓储接口

use async_trait::async_trait;
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;

use super::client::{Client, ClientClaim, ClientName, ClientProperty, ClientSecret};
use super::clone::CloneOptions;
use crate::domain::catalog::{Catalog, SelectItem};

/// Client 仓储接口
///
/// 写操作返回 `0` 表示写冲突（标识未生成或影响行数为 0），此时没有任何更改可见。
#[async_trait]
pub trait ClientRepository: UnitOfWork {
    /// 注入的参考数据
    fn catalog(&self) -> &Catalog;

    /// 读取完整聚合（根 + 全部子集合）
    async fn get_client(&self, id: EntityId) -> RepoResult<Option<Client>>;

    /// 按 client_id / client_name 子串分页查询根记录，按 client_name 排序
    async fn get_clients(&self, search: &str, pagination: Pagination) -> RepoResult<PagedResult<Client>>;

    async fn get_client_id(&self, id: EntityId) -> RepoResult<Option<ClientName>>;

    /// 是否存在相同 client_id 的记录；`exclude` 为更新时排除的自身标识
    async fn client_id_exists(&self, client_id: &str, exclude: Option<EntityId>) -> RepoResult<bool>;

    /// 新增 / 克隆时检查 client_id 是否空闲；更新时排除自身
    async fn can_insert_client(&self, client: &Client, is_clone: bool) -> RepoResult<bool> {
        let exclude = if client.id == NEW_ID || is_clone {
            None
        } else {
            Some(client.id)
        };
        Ok(!self.client_id_exists(&client.client_id, exclude).await?)
    }

    /// 插入聚合，返回新标识
    async fn add_client(&self, client: &Client) -> RepoResult<EntityId>;

    /// 全量替换子集合并更新根记录，返回根记录影响行数
    async fn update_client(&self, client: &Client) -> RepoResult<u64>;

    /// 删除聚合，返回根记录影响行数
    async fn remove_client(&self, client: &Client) -> RepoResult<u64>;

    /// 克隆聚合，返回新标识
    async fn clone_client(&self, client: &Client, options: &CloneOptions) -> RepoResult<EntityId> {
        let copy = client.prepare_clone(options);
        self.add_client(&copy).await
    }

    /// 匹配的 IdentityResource 与 ApiResource 名称，`limit` 分别作用于两类资源
    async fn get_scopes(&self, filter: &str, limit: usize) -> RepoResult<Vec<String>>;

    fn get_grant_types(&self, filter: &str, limit: usize) -> Vec<String> {
        self.catalog().grant_types(filter, limit)
    }

    fn get_standard_claims(&self, filter: &str, limit: usize) -> Vec<String> {
        self.catalog().standard_claims(filter, limit)
    }

    fn get_secret_types(&self) -> Vec<SelectItem> {
        self.catalog().secret_types()
    }

    fn get_protocol_types(&self) -> Vec<SelectItem> {
        self.catalog().protocol_types()
    }

    fn get_access_token_types(&self) -> Vec<SelectItem> {
        self.catalog().access_token_types()
    }

    fn get_token_expirations(&self) -> Vec<SelectItem> {
        self.catalog().token_expirations()
    }

    fn get_token_usage(&self) -> Vec<SelectItem> {
        self.catalog().token_usages()
    }

    fn get_hash_types(&self) -> Vec<SelectItem> {
        self.catalog().hash_types()
    }

    async fn get_client_secrets(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientSecret>>;

    async fn get_client_secret(&self, secret_id: EntityId) -> RepoResult<Option<ClientSecret>>;

    /// 父记录不存在时返回 `0`
    async fn add_client_secret(&self, client_id: EntityId, secret: &ClientSecret) -> RepoResult<EntityId>;

    async fn delete_client_secret(&self, secret: &ClientSecret) -> RepoResult<u64>;

    async fn get_client_claims(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientClaim>>;

    async fn get_client_claim(&self, claim_id: EntityId) -> RepoResult<Option<ClientClaim>>;

    async fn add_client_claim(&self, client_id: EntityId, claim: &ClientClaim) -> RepoResult<EntityId>;

    async fn delete_client_claim(&self, claim: &ClientClaim) -> RepoResult<u64>;

    async fn get_client_properties(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientProperty>>;

    async fn get_client_property(&self, property_id: EntityId) -> RepoResult<Option<ClientProperty>>;

    async fn add_client_property(
        &self,
        client_id: EntityId,
        property: &ClientProperty,
    ) -> RepoResult<EntityId>;

    async fn delete_client_property(&self, property: &ClientProperty) -> RepoResult<u64>;
}
