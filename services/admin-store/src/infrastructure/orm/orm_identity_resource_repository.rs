use std::sync::Arc;

use async_trait::async_trait;
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use tracing::debug;

use super::context::{ConfigurationContext, Outcome, Session};
use super::convert::identity_resource_active;
use super::entities::*;
use super::error_mapper::map_db_err;
use super::{byte_order, delete_children, insert_children, load_children, page_window, removed, search_condition};
use crate::domain::identity_resource::{IdentityResource, IdentityResourceRepository};
use crate::infrastructure::tables::{IDENTITY_CLAIMS, IDENTITY_RESOURCES};

const AGGREGATE: &str = "identity_resource";

pub struct OrmIdentityResourceRepository {
    context: Arc<ConfigurationContext>,
}

impl OrmIdentityResourceRepository {
    pub fn new(context: Arc<ConfigurationContext>) -> Self {
        Self { context }
    }

    async fn load(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Option<IdentityResource>> {
        let Some(model) = identity_resource::Entity::find_by_id(id)
            .one(txn)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let mut resource = IdentityResource::from(model);
        resource.user_claims = load_children::<identity_claim::Entity, _>(
            txn,
            identity_claim::Column::IdentityResourceId,
            identity_claim::Column::Id,
            id,
        )
        .await?;
        Ok(Some(resource))
    }

    async fn page(
        txn: &DatabaseTransaction,
        search: &str,
        pagination: &Pagination,
    ) -> RepoResult<PagedResult<IdentityResource>> {
        let (limit, offset) = page_window(pagination)?;
        let query =
            identity_resource::Entity::find().filter(search_condition(&[identity_resource::Column::Name], search));

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let models = query
            .order_by_asc(byte_order(txn.get_database_backend(), identity_resource::Column::Name))
            .order_by_asc(identity_resource::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(txn)
            .await
            .map_err(map_db_err)?;
        Ok(PagedResult::new(
            models.into_iter().map(IdentityResource::from).collect(),
            total,
            pagination,
        ))
    }

    async fn name_taken(txn: &DatabaseTransaction, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let mut query = identity_resource::Entity::find().filter(identity_resource::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(identity_resource::Column::Id.ne(id));
        }
        Ok(query.count(txn).await.map_err(map_db_err)? > 0)
    }

    async fn insert(session: &mut Session<'_>, resource: &IdentityResource) -> RepoResult<Outcome<EntityId>> {
        let model = identity_resource_active(resource)
            .insert(session.txn())
            .await
            .map_err(map_db_err)?;
        if session.affected(IDENTITY_RESOURCES, 1) == 0 {
            return Ok(Outcome::Rollback(IDENTITY_RESOURCES, NEW_ID));
        }
        if !insert_children(session, IDENTITY_CLAIMS, &resource.user_claims, model.id).await? {
            return Ok(Outcome::Rollback(IDENTITY_CLAIMS, NEW_ID));
        }
        Ok(Outcome::Commit(model.id))
    }

    async fn update(session: &mut Session<'_>, resource: &IdentityResource) -> RepoResult<Outcome<u64>> {
        delete_children::<identity_claim::Entity>(
            session.txn(),
            identity_claim::Column::IdentityResourceId,
            resource.id,
        )
        .await?;

        let rows = identity_resource::Entity::update_many()
            .set(identity_resource_active(resource))
            .filter(identity_resource::Column::Id.eq(resource.id))
            .exec(session.txn())
            .await
            .map_err(map_db_err)?
            .rows_affected;
        if session.affected(IDENTITY_RESOURCES, rows) == 0 {
            return Ok(Outcome::Rollback(IDENTITY_RESOURCES, 0));
        }

        if !insert_children(session, IDENTITY_CLAIMS, &resource.user_claims, resource.id).await? {
            return Ok(Outcome::Rollback(IDENTITY_CLAIMS, 0));
        }
        Ok(Outcome::Commit(rows))
    }

    async fn remove(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Outcome<u64>> {
        delete_children::<identity_claim::Entity>(txn, identity_claim::Column::IdentityResourceId, id).await?;
        let result = identity_resource::Entity::delete_by_id(id)
            .exec(txn)
            .await
            .map_err(map_db_err)?;
        Ok(removed(result.rows_affected))
    }
}

#[async_trait]
impl UnitOfWork for OrmIdentityResourceRepository {
    fn auto_save_changes(&self) -> bool {
        self.context.auto_save_changes()
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        self.context.save_changes().await
    }
}

#[async_trait]
impl IdentityResourceRepository for OrmIdentityResourceRepository {
    async fn get_identity_resources(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<IdentityResource>> {
        let session = self.context.read().await?;
        let result = Self::page(session.txn(), search, &pagination).await;
        session.finish(result).await
    }

    async fn get_identity_resource(&self, id: EntityId) -> RepoResult<Option<IdentityResource>> {
        debug!("Finding identity resource by id: {}", id);
        let session = self.context.read().await?;
        let result = Self::load(session.txn(), id).await;
        session.finish(result).await
    }

    async fn identity_resource_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let session = self.context.read().await?;
        let result = Self::name_taken(session.txn(), name, exclude).await;
        session.finish(result).await
    }

    async fn add_identity_resource(&self, resource: &IdentityResource) -> RepoResult<EntityId> {
        debug!(name = %resource.name, "Adding identity resource");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::insert(&mut session, resource).await;
        session.complete(result).await
    }

    async fn update_identity_resource(&self, resource: &IdentityResource) -> RepoResult<u64> {
        debug!(id = resource.id, name = %resource.name, "Updating identity resource");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::update(&mut session, resource).await;
        session.complete(result).await
    }

    async fn delete_identity_resource(&self, resource: &IdentityResource) -> RepoResult<u64> {
        debug!(id = resource.id, "Deleting identity resource");
        let session = self.context.write(AGGREGATE).await?;
        let result = Self::remove(session.txn(), resource.id).await;
        session.complete(result).await
    }
}
