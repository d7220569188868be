use std::sync::Arc;

use async_trait::async_trait;
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination};
use ids_errors::{RepoResult, RepositoryError};
use ids_ports::UnitOfWork;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use tracing::debug;

use super::context::{ConfigurationContext, Outcome, Session};
use super::convert::{ChildRow, api_resource_active};
use super::entities::*;
use super::error_mapper::map_db_err;
use super::{
    byte_order, delete_children, insert_child, insert_children, load_children, page_children, page_window,
    removed, search_condition,
};
use crate::domain::api_resource::{ApiResource, ApiResourceRepository, ApiScope, ApiSecret};
use crate::infrastructure::tables::*;

const AGGREGATE: &str = "api_resource";

pub struct OrmApiResourceRepository {
    context: Arc<ConfigurationContext>,
}

impl OrmApiResourceRepository {
    pub fn new(context: Arc<ConfigurationContext>) -> Self {
        Self { context }
    }

    async fn load(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Option<ApiResource>> {
        let Some(model) = api_resource::Entity::find_by_id(id).one(txn).await.map_err(map_db_err)? else {
            return Ok(None);
        };

        let mut resource = ApiResource::from(model);
        resource.user_claims = load_children::<api_resource_claim::Entity, _>(
            txn,
            api_resource_claim::Column::ApiResourceId,
            api_resource_claim::Column::Id,
            id,
        )
        .await?;
        resource.secrets = load_children::<api_secret::Entity, _>(
            txn,
            api_secret::Column::ApiResourceId,
            api_secret::Column::Id,
            id,
        )
        .await?;

        let mut scopes: Vec<ApiScope> = load_children::<api_scope::Entity, _>(
            txn,
            api_scope::Column::ApiResourceId,
            api_scope::Column::Id,
            id,
        )
        .await?;
        for scope in &mut scopes {
            Self::load_scope_claims(txn, scope).await?;
        }
        resource.scopes = scopes;
        Ok(Some(resource))
    }

    async fn load_scope_claims(txn: &DatabaseTransaction, scope: &mut ApiScope) -> RepoResult<()> {
        scope.user_claims = load_children::<api_scope_claim::Entity, _>(
            txn,
            api_scope_claim::Column::ApiScopeId,
            api_scope_claim::Column::Id,
            scope.id,
        )
        .await?;
        Ok(())
    }

    async fn page(
        txn: &DatabaseTransaction,
        search: &str,
        pagination: &Pagination,
    ) -> RepoResult<PagedResult<ApiResource>> {
        let (limit, offset) = page_window(pagination)?;
        let query = api_resource::Entity::find().filter(search_condition(&[api_resource::Column::Name], search));

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let models = query
            .order_by_asc(byte_order(txn.get_database_backend(), api_resource::Column::Name))
            .order_by_asc(api_resource::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(txn)
            .await
            .map_err(map_db_err)?;
        Ok(PagedResult::new(
            models.into_iter().map(ApiResource::from).collect(),
            total,
            pagination,
        ))
    }

    async fn page_scopes(
        txn: &DatabaseTransaction,
        api_resource_id: EntityId,
        pagination: &Pagination,
    ) -> RepoResult<PagedResult<ApiScope>> {
        let (limit, offset) = page_window(pagination)?;
        let query = api_scope::Entity::find().filter(api_scope::Column::ApiResourceId.eq(api_resource_id));

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let models = query
            .order_by_asc(byte_order(txn.get_database_backend(), api_scope::Column::Name))
            .order_by_asc(api_scope::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(txn)
            .await
            .map_err(map_db_err)?;
        Ok(PagedResult::new(
            models.into_iter().map(ApiScope::from).collect(),
            total,
            pagination,
        ))
    }

    async fn scope(
        txn: &DatabaseTransaction,
        api_resource_id: EntityId,
        scope_id: EntityId,
    ) -> RepoResult<Option<ApiScope>> {
        let model = api_scope::Entity::find_by_id(scope_id)
            .filter(api_scope::Column::ApiResourceId.eq(api_resource_id))
            .one(txn)
            .await
            .map_err(map_db_err)?;

        match model {
            Some(model) => {
                let mut scope = ApiScope::from(model);
                Self::load_scope_claims(txn, &mut scope).await?;
                Ok(Some(scope))
            }
            None => Ok(None),
        }
    }

    async fn name(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Option<String>> {
        api_resource::Entity::find_by_id(id)
            .select_only()
            .column(api_resource::Column::Name)
            .into_tuple::<String>()
            .one(txn)
            .await
            .map_err(map_db_err)
    }

    async fn exists(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<bool> {
        let count = api_resource::Entity::find()
            .filter(api_resource::Column::Id.eq(id))
            .count(txn)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn name_taken(txn: &DatabaseTransaction, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let mut query = api_resource::Entity::find().filter(api_resource::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(api_resource::Column::Id.ne(id));
        }
        Ok(query.count(txn).await.map_err(map_db_err)? > 0)
    }

    async fn scope_name_taken(txn: &DatabaseTransaction, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let mut query = api_scope::Entity::find().filter(api_scope::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(api_scope::Column::Id.ne(id));
        }
        Ok(query.count(txn).await.map_err(map_db_err)? > 0)
    }

    /// 写入 scope 及其声明，返回新标识或影响行数为 0 的表
    async fn insert_scope(
        session: &mut Session<'_>,
        api_resource_id: EntityId,
        scope: &ApiScope,
    ) -> RepoResult<Result<EntityId, &'static str>> {
        let model = scope
            .active(api_resource_id)
            .insert(session.txn())
            .await
            .map_err(map_db_err)?;
        if session.affected(API_SCOPES, 1) == 0 {
            return Ok(Err(API_SCOPES));
        }
        if !insert_children(session, API_SCOPE_CLAIMS, &scope.user_claims, model.id).await? {
            return Ok(Err(API_SCOPE_CLAIMS));
        }
        Ok(Ok(model.id))
    }

    async fn insert_collections(
        session: &mut Session<'_>,
        id: EntityId,
        resource: &ApiResource,
    ) -> RepoResult<Option<&'static str>> {
        if !insert_children(session, API_RESOURCE_CLAIMS, &resource.user_claims, id).await? {
            return Ok(Some(API_RESOURCE_CLAIMS));
        }
        if !insert_children(session, API_SECRETS, &resource.secrets, id).await? {
            return Ok(Some(API_SECRETS));
        }
        for scope in &resource.scopes {
            if let Err(table) = Self::insert_scope(session, id, scope).await? {
                return Ok(Some(table));
            }
        }
        Ok(None)
    }

    /// scope 声明先于 scope 删除
    async fn delete_collections(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<()> {
        let scope_ids: Vec<EntityId> = api_scope::Entity::find()
            .select_only()
            .column(api_scope::Column::Id)
            .filter(api_scope::Column::ApiResourceId.eq(id))
            .into_tuple::<EntityId>()
            .all(txn)
            .await
            .map_err(map_db_err)?;
        if !scope_ids.is_empty() {
            api_scope_claim::Entity::delete_many()
                .filter(api_scope_claim::Column::ApiScopeId.is_in(scope_ids))
                .exec(txn)
                .await
                .map_err(map_db_err)?;
        }

        delete_children::<api_scope::Entity>(txn, api_scope::Column::ApiResourceId, id).await?;
        delete_children::<api_secret::Entity>(txn, api_secret::Column::ApiResourceId, id).await?;
        delete_children::<api_resource_claim::Entity>(txn, api_resource_claim::Column::ApiResourceId, id).await?;
        Ok(())
    }

    async fn insert(session: &mut Session<'_>, resource: &ApiResource) -> RepoResult<Outcome<EntityId>> {
        let model = api_resource_active(resource)
            .insert(session.txn())
            .await
            .map_err(map_db_err)?;
        if session.affected(API_RESOURCES, 1) == 0 {
            return Ok(Outcome::Rollback(API_RESOURCES, NEW_ID));
        }
        if let Some(table) = Self::insert_collections(session, model.id, resource).await? {
            return Ok(Outcome::Rollback(table, NEW_ID));
        }
        Ok(Outcome::Commit(model.id))
    }

    async fn update(session: &mut Session<'_>, resource: &ApiResource) -> RepoResult<Outcome<u64>> {
        Self::delete_collections(session.txn(), resource.id).await?;

        let rows = api_resource::Entity::update_many()
            .set(api_resource_active(resource))
            .filter(api_resource::Column::Id.eq(resource.id))
            .exec(session.txn())
            .await
            .map_err(map_db_err)?
            .rows_affected;
        if session.affected(API_RESOURCES, rows) == 0 {
            return Ok(Outcome::Rollback(API_RESOURCES, 0));
        }

        if let Some(table) = Self::insert_collections(session, resource.id, resource).await? {
            return Ok(Outcome::Rollback(table, 0));
        }
        Ok(Outcome::Commit(rows))
    }

    async fn remove(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Outcome<u64>> {
        Self::delete_collections(txn, id).await?;
        let result = api_resource::Entity::delete_by_id(id).exec(txn).await.map_err(map_db_err)?;
        Ok(removed(result.rows_affected))
    }

    async fn add_scope(
        session: &mut Session<'_>,
        api_resource_id: EntityId,
        scope: &ApiScope,
    ) -> RepoResult<Outcome<EntityId>> {
        if !Self::exists(session.txn(), api_resource_id).await? {
            return Ok(Outcome::Unchanged(NEW_ID));
        }
        Ok(match Self::insert_scope(session, api_resource_id, scope).await? {
            Ok(id) => Outcome::Commit(id),
            Err(table) => Outcome::Rollback(table, NEW_ID),
        })
    }

    /// 删除 scope 声明、更新 scope、重新插入声明
    async fn update_scope(
        session: &mut Session<'_>,
        api_resource_id: EntityId,
        scope: &ApiScope,
    ) -> RepoResult<Outcome<u64>> {
        delete_children::<api_scope_claim::Entity>(session.txn(), api_scope_claim::Column::ApiScopeId, scope.id)
            .await?;

        let rows = api_scope::Entity::update_many()
            .set(scope.active(api_resource_id))
            .filter(api_scope::Column::Id.eq(scope.id))
            .filter(api_scope::Column::ApiResourceId.eq(api_resource_id))
            .exec(session.txn())
            .await
            .map_err(map_db_err)?
            .rows_affected;
        if session.affected(API_SCOPES, rows) == 0 {
            return Ok(Outcome::Rollback(API_SCOPES, 0));
        }

        if !insert_children(session, API_SCOPE_CLAIMS, &scope.user_claims, scope.id).await? {
            return Ok(Outcome::Rollback(API_SCOPE_CLAIMS, 0));
        }
        Ok(Outcome::Commit(rows))
    }

    async fn remove_scope(txn: &DatabaseTransaction, scope_id: EntityId) -> RepoResult<Outcome<u64>> {
        delete_children::<api_scope_claim::Entity>(txn, api_scope_claim::Column::ApiScopeId, scope_id).await?;
        let result = api_scope::Entity::delete_by_id(scope_id).exec(txn).await.map_err(map_db_err)?;
        Ok(removed(result.rows_affected))
    }

    async fn add_secret(
        session: &mut Session<'_>,
        api_resource_id: EntityId,
        secret: &ApiSecret,
    ) -> RepoResult<Outcome<EntityId>> {
        if !Self::exists(session.txn(), api_resource_id).await? {
            return Ok(Outcome::Unchanged(NEW_ID));
        }
        insert_child(session, API_SECRETS, secret, api_resource_id).await
    }
}

#[async_trait]
impl UnitOfWork for OrmApiResourceRepository {
    fn auto_save_changes(&self) -> bool {
        self.context.auto_save_changes()
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        self.context.save_changes().await
    }
}

#[async_trait]
impl ApiResourceRepository for OrmApiResourceRepository {
    async fn get_api_resources(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiResource>> {
        let session = self.context.read().await?;
        let result = Self::page(session.txn(), search, &pagination).await;
        session.finish(result).await
    }

    async fn get_api_resource(&self, id: EntityId) -> RepoResult<Option<ApiResource>> {
        debug!("Finding api resource by id: {}", id);
        let session = self.context.read().await?;
        let result = Self::load(session.txn(), id).await;
        session.finish(result).await
    }

    async fn api_resource_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let session = self.context.read().await?;
        let result = Self::name_taken(session.txn(), name, exclude).await;
        session.finish(result).await
    }

    async fn add_api_resource(&self, resource: &ApiResource) -> RepoResult<EntityId> {
        debug!(name = %resource.name, "Adding api resource");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::insert(&mut session, resource).await;
        session.complete(result).await
    }

    async fn update_api_resource(&self, resource: &ApiResource) -> RepoResult<u64> {
        debug!(id = resource.id, name = %resource.name, "Updating api resource");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::update(&mut session, resource).await;
        session.complete(result).await
    }

    async fn delete_api_resource(&self, resource: &ApiResource) -> RepoResult<u64> {
        debug!(id = resource.id, "Deleting api resource");
        let session = self.context.write(AGGREGATE).await?;
        let result = Self::remove(session.txn(), resource.id).await;
        session.complete(result).await
    }

    async fn get_api_resource_name(&self, id: EntityId) -> RepoResult<String> {
        let session = self.context.read().await?;
        let result = Self::name(session.txn(), id).await;
        session
            .finish(result)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Api resource {} not found", id)))
    }

    async fn get_api_scopes(
        &self,
        api_resource_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiScope>> {
        let session = self.context.read().await?;
        let result = Self::page_scopes(session.txn(), api_resource_id, &pagination).await;
        session.finish(result).await
    }

    async fn get_api_scope(&self, api_resource_id: EntityId, scope_id: EntityId) -> RepoResult<Option<ApiScope>> {
        let session = self.context.read().await?;
        let result = Self::scope(session.txn(), api_resource_id, scope_id).await;
        session.finish(result).await
    }

    async fn api_scope_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let session = self.context.read().await?;
        let result = Self::scope_name_taken(session.txn(), name, exclude).await;
        session.finish(result).await
    }

    async fn add_api_scope(&self, api_resource_id: EntityId, scope: &ApiScope) -> RepoResult<EntityId> {
        debug!(api_resource_id, name = %scope.name, "Adding api scope");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::add_scope(&mut session, api_resource_id, scope).await;
        session.complete(result).await
    }

    async fn update_api_scope(&self, api_resource_id: EntityId, scope: &ApiScope) -> RepoResult<u64> {
        debug!(api_resource_id, scope_id = scope.id, "Updating api scope");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::update_scope(&mut session, api_resource_id, scope).await;
        session.complete(result).await
    }

    async fn delete_api_scope(&self, scope: &ApiScope) -> RepoResult<u64> {
        debug!(scope_id = scope.id, "Deleting api scope");
        let session = self.context.write(AGGREGATE).await?;
        let result = Self::remove_scope(session.txn(), scope.id).await;
        session.complete(result).await
    }

    async fn get_api_secrets(
        &self,
        api_resource_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiSecret>> {
        let session = self.context.read().await?;
        let result = page_children::<api_secret::Entity, _>(
            session.txn(),
            api_secret::Column::ApiResourceId,
            api_secret::Column::Id,
            api_resource_id,
            &pagination,
        )
        .await;
        session.finish(result).await
    }

    async fn get_api_secret(&self, secret_id: EntityId) -> RepoResult<Option<ApiSecret>> {
        let session = self.context.read().await?;
        let result = api_secret::Entity::find_by_id(secret_id)
            .one(session.txn())
            .await
            .map(|m| m.map(ApiSecret::from))
            .map_err(map_db_err);
        session.finish(result).await
    }

    async fn add_api_secret(&self, api_resource_id: EntityId, secret: &ApiSecret) -> RepoResult<EntityId> {
        debug!(api_resource_id, "Adding api secret");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::add_secret(&mut session, api_resource_id, secret).await;
        session.complete(result).await
    }

    async fn delete_api_secret(&self, secret: &ApiSecret) -> RepoResult<u64> {
        let session = self.context.write(AGGREGATE).await?;
        let result = api_secret::Entity::delete_by_id(secret.id)
            .exec(session.txn())
            .await
            .map(|r| removed(r.rows_affected))
            .map_err(map_db_err);
        session.complete(result).await
    }
}
