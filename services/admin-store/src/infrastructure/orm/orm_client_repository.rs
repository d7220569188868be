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
use super::convert::client_active;
use super::entities::*;
use super::error_mapper::map_db_err;
use super::{
    byte_order, delete_children, insert_child, insert_children, load_children, nulls_first, page_children,
    page_window, removed, search_condition,
};
use crate::domain::catalog::Catalog;
use crate::domain::client::{
    Client, ClientClaim, ClientName, ClientProperty, ClientRepository, ClientSecret,
};
use crate::infrastructure::db_metrics::QueryTimer;
use crate::infrastructure::tables::*;

const AGGREGATE: &str = "client";

pub struct OrmClientRepository {
    context: Arc<ConfigurationContext>,
    catalog: Arc<Catalog>,
}

impl OrmClientRepository {
    pub fn new(context: Arc<ConfigurationContext>, catalog: Arc<Catalog>) -> Self {
        Self { context, catalog }
    }

    /// 根记录之后依次读取各子集合
    async fn load(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Option<Client>> {
        let Some(model) = client::Entity::find_by_id(id).one(txn).await.map_err(map_db_err)? else {
            return Ok(None);
        };

        let mut c = Client::try_from(model)?;
        c.allowed_grant_types = load_children::<client_grant_type::Entity, _>(
            txn,
            client_grant_type::Column::ClientId,
            client_grant_type::Column::Id,
            id,
        )
        .await?;
        c.redirect_uris = load_children::<client_redirect_uri::Entity, _>(
            txn,
            client_redirect_uri::Column::ClientId,
            client_redirect_uri::Column::Id,
            id,
        )
        .await?;
        c.post_logout_redirect_uris = load_children::<client_post_logout_redirect_uri::Entity, _>(
            txn,
            client_post_logout_redirect_uri::Column::ClientId,
            client_post_logout_redirect_uri::Column::Id,
            id,
        )
        .await?;
        c.allowed_scopes = load_children::<client_scope::Entity, _>(
            txn,
            client_scope::Column::ClientId,
            client_scope::Column::Id,
            id,
        )
        .await?;
        c.client_secrets = load_children::<client_secret::Entity, _>(
            txn,
            client_secret::Column::ClientId,
            client_secret::Column::Id,
            id,
        )
        .await?;
        c.claims = load_children::<client_claim::Entity, _>(
            txn,
            client_claim::Column::ClientId,
            client_claim::Column::Id,
            id,
        )
        .await?;
        c.identity_provider_restrictions = load_children::<client_idp_restriction::Entity, _>(
            txn,
            client_idp_restriction::Column::ClientId,
            client_idp_restriction::Column::Id,
            id,
        )
        .await?;
        c.allowed_cors_origins = load_children::<client_cors_origin::Entity, _>(
            txn,
            client_cors_origin::Column::ClientId,
            client_cors_origin::Column::Id,
            id,
        )
        .await?;
        c.properties = load_children::<client_property::Entity, _>(
            txn,
            client_property::Column::ClientId,
            client_property::Column::Id,
            id,
        )
        .await?;
        Ok(Some(c))
    }

    async fn page(txn: &DatabaseTransaction, search: &str, pagination: &Pagination) -> RepoResult<PagedResult<Client>> {
        let (limit, offset) = page_window(pagination)?;
        let query = client::Entity::find().filter(search_condition(
            &[client::Column::ClientId, client::Column::ClientName],
            search,
        ));

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let models = query
            .order_by_asc(nulls_first(client::Column::ClientName))
            .order_by_asc(byte_order(txn.get_database_backend(), client::Column::ClientName))
            .order_by_asc(client::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(txn)
            .await
            .map_err(map_db_err)?;

        let items = models.into_iter().map(Client::try_from).collect::<RepoResult<Vec<_>>>()?;
        Ok(PagedResult::new(items, total, pagination))
    }

    async fn name(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Option<ClientName>> {
        let row = client::Entity::find_by_id(id)
            .select_only()
            .column(client::Column::ClientId)
            .column(client::Column::ClientName)
            .into_tuple::<(String, Option<String>)>()
            .one(txn)
            .await
            .map_err(map_db_err)?;
        Ok(row.map(|(client_id, client_name)| ClientName { client_id, client_name }))
    }

    async fn exists(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<bool> {
        let count = client::Entity::find()
            .filter(client::Column::Id.eq(id))
            .count(txn)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn client_id_taken(
        txn: &DatabaseTransaction,
        client_id: &str,
        exclude: Option<EntityId>,
    ) -> RepoResult<bool> {
        let mut query = client::Entity::find().filter(client::Column::ClientId.eq(client_id));
        if let Some(id) = exclude {
            query = query.filter(client::Column::Id.ne(id));
        }
        Ok(query.count(txn).await.map_err(map_db_err)? > 0)
    }

    /// 匹配的资源名称，按字节序；`limit` 为 0 时不限制
    async fn names<E: EntityTrait>(
        txn: &DatabaseTransaction,
        column: E::Column,
        filter: &str,
        limit: usize,
    ) -> RepoResult<Vec<String>> {
        let mut query = E::find()
            .select_only()
            .column(column)
            .filter(search_condition(&[column], filter))
            .order_by_asc(byte_order(txn.get_database_backend(), column));
        if limit > 0 {
            query = query.limit(limit as u64);
        }
        query.into_tuple::<String>().all(txn).await.map_err(map_db_err)
    }

    /// 按写入顺序插入全部子集合，返回影响行数为 0 的表
    async fn insert_collections(
        session: &mut Session<'_>,
        id: EntityId,
        client: &Client,
    ) -> RepoResult<Option<&'static str>> {
        if !insert_children(session, CLIENT_SCOPES, &client.allowed_scopes, id).await? {
            return Ok(Some(CLIENT_SCOPES));
        }
        if !insert_children(session, CLIENT_GRANT_TYPES, &client.allowed_grant_types, id).await? {
            return Ok(Some(CLIENT_GRANT_TYPES));
        }
        if !insert_children(session, CLIENT_REDIRECT_URIS, &client.redirect_uris, id).await? {
            return Ok(Some(CLIENT_REDIRECT_URIS));
        }
        if !insert_children(session, CLIENT_CORS_ORIGINS, &client.allowed_cors_origins, id).await? {
            return Ok(Some(CLIENT_CORS_ORIGINS));
        }
        if !insert_children(
            session,
            CLIENT_IDP_RESTRICTIONS,
            &client.identity_provider_restrictions,
            id,
        )
        .await?
        {
            return Ok(Some(CLIENT_IDP_RESTRICTIONS));
        }
        if !insert_children(
            session,
            CLIENT_POST_LOGOUT_REDIRECT_URIS,
            &client.post_logout_redirect_uris,
            id,
        )
        .await?
        {
            return Ok(Some(CLIENT_POST_LOGOUT_REDIRECT_URIS));
        }
        if !insert_children(session, CLIENT_SECRETS, &client.client_secrets, id).await? {
            return Ok(Some(CLIENT_SECRETS));
        }
        if !insert_children(session, CLIENT_CLAIMS, &client.claims, id).await? {
            return Ok(Some(CLIENT_CLAIMS));
        }
        if !insert_children(session, CLIENT_PROPERTIES, &client.properties, id).await? {
            return Ok(Some(CLIENT_PROPERTIES));
        }
        Ok(None)
    }

    async fn delete_collections(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<()> {
        delete_children::<client_scope::Entity>(txn, client_scope::Column::ClientId, id).await?;
        delete_children::<client_grant_type::Entity>(txn, client_grant_type::Column::ClientId, id).await?;
        delete_children::<client_redirect_uri::Entity>(txn, client_redirect_uri::Column::ClientId, id).await?;
        delete_children::<client_cors_origin::Entity>(txn, client_cors_origin::Column::ClientId, id).await?;
        delete_children::<client_idp_restriction::Entity>(txn, client_idp_restriction::Column::ClientId, id)
            .await?;
        delete_children::<client_post_logout_redirect_uri::Entity>(
            txn,
            client_post_logout_redirect_uri::Column::ClientId,
            id,
        )
        .await?;
        delete_children::<client_secret::Entity>(txn, client_secret::Column::ClientId, id).await?;
        delete_children::<client_claim::Entity>(txn, client_claim::Column::ClientId, id).await?;
        delete_children::<client_property::Entity>(txn, client_property::Column::ClientId, id).await?;
        Ok(())
    }

    async fn insert(session: &mut Session<'_>, client: &Client) -> RepoResult<Outcome<EntityId>> {
        let model = client_active(client).insert(session.txn()).await.map_err(map_db_err)?;
        if session.affected(CLIENTS, 1) == 0 {
            return Ok(Outcome::Rollback(CLIENTS, NEW_ID));
        }
        if let Some(table) = Self::insert_collections(session, model.id, client).await? {
            return Ok(Outcome::Rollback(table, NEW_ID));
        }
        Ok(Outcome::Commit(model.id))
    }

    /// 删除子集合、更新根记录、重新插入子集合
    async fn update(session: &mut Session<'_>, client: &Client) -> RepoResult<Outcome<u64>> {
        Self::delete_collections(session.txn(), client.id).await?;

        let rows = client::Entity::update_many()
            .set(client_active(client))
            .filter(client::Column::Id.eq(client.id))
            .exec(session.txn())
            .await
            .map_err(map_db_err)?
            .rows_affected;
        if session.affected(CLIENTS, rows) == 0 {
            return Ok(Outcome::Rollback(CLIENTS, 0));
        }

        if let Some(table) = Self::insert_collections(session, client.id, client).await? {
            return Ok(Outcome::Rollback(table, 0));
        }
        Ok(Outcome::Commit(rows))
    }

    async fn remove(txn: &DatabaseTransaction, id: EntityId) -> RepoResult<Outcome<u64>> {
        Self::delete_collections(txn, id).await?;
        let result = client::Entity::delete_by_id(id).exec(txn).await.map_err(map_db_err)?;
        Ok(removed(result.rows_affected))
    }

    async fn add_child_secret(
        session: &mut Session<'_>,
        client_id: EntityId,
        secret: &ClientSecret,
    ) -> RepoResult<Outcome<EntityId>> {
        if !Self::exists(session.txn(), client_id).await? {
            return Ok(Outcome::Unchanged(NEW_ID));
        }
        insert_child(session, CLIENT_SECRETS, secret, client_id).await
    }

    async fn add_child_claim(
        session: &mut Session<'_>,
        client_id: EntityId,
        claim: &ClientClaim,
    ) -> RepoResult<Outcome<EntityId>> {
        if !Self::exists(session.txn(), client_id).await? {
            return Ok(Outcome::Unchanged(NEW_ID));
        }
        insert_child(session, CLIENT_CLAIMS, claim, client_id).await
    }

    async fn add_child_property(
        session: &mut Session<'_>,
        client_id: EntityId,
        property: &ClientProperty,
    ) -> RepoResult<Outcome<EntityId>> {
        if !Self::exists(session.txn(), client_id).await? {
            return Ok(Outcome::Unchanged(NEW_ID));
        }
        insert_child(session, CLIENT_PROPERTIES, property, client_id).await
    }
}

#[async_trait]
impl UnitOfWork for OrmClientRepository {
    fn auto_save_changes(&self) -> bool {
        self.context.auto_save_changes()
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        self.context.save_changes().await
    }
}

#[async_trait]
impl ClientRepository for OrmClientRepository {
    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn get_client(&self, id: EntityId) -> RepoResult<Option<Client>> {
        debug!("Finding client by id: {}", id);
        let timer = QueryTimer::new(CLIENTS, "read_aggregate");
        let session = self.context.read().await?;
        let result = Self::load(session.txn(), id).await;
        let client = session.finish(result).await;
        timer.finish();
        client
    }

    async fn get_clients(&self, search: &str, pagination: Pagination) -> RepoResult<PagedResult<Client>> {
        let session = self.context.read().await?;
        let result = Self::page(session.txn(), search, &pagination).await;
        session.finish(result).await
    }

    async fn get_client_id(&self, id: EntityId) -> RepoResult<Option<ClientName>> {
        let session = self.context.read().await?;
        let result = Self::name(session.txn(), id).await;
        session.finish(result).await
    }

    async fn client_id_exists(&self, client_id: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        let session = self.context.read().await?;
        let result = Self::client_id_taken(session.txn(), client_id, exclude).await;
        session.finish(result).await
    }

    async fn add_client(&self, client: &Client) -> RepoResult<EntityId> {
        debug!(client_id = %client.client_id, "Adding client");
        let timer = QueryTimer::new(CLIENTS, "insert_aggregate");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::insert(&mut session, client).await;
        let id = session.complete(result).await;
        timer.finish();
        id
    }

    async fn update_client(&self, client: &Client) -> RepoResult<u64> {
        debug!(id = client.id, client_id = %client.client_id, "Updating client");
        let timer = QueryTimer::new(CLIENTS, "update_aggregate");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::update(&mut session, client).await;
        let rows = session.complete(result).await;
        timer.finish();
        rows
    }

    async fn remove_client(&self, client: &Client) -> RepoResult<u64> {
        debug!(id = client.id, "Removing client");
        let session = self.context.write(AGGREGATE).await?;
        let result = Self::remove(session.txn(), client.id).await;
        session.complete(result).await
    }

    async fn get_scopes(&self, filter: &str, limit: usize) -> RepoResult<Vec<String>> {
        let session = self.context.read().await?;
        let identity =
            Self::names::<identity_resource::Entity>(session.txn(), identity_resource::Column::Name, filter, limit)
                .await;
        let result = match identity {
            Ok(mut names) => {
                Self::names::<api_resource::Entity>(session.txn(), api_resource::Column::Name, filter, limit)
                    .await
                    .map(|api| {
                        names.extend(api);
                        names
                    })
            }
            Err(err) => Err(err),
        };
        session.finish(result).await
    }

    async fn get_client_secrets(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientSecret>> {
        let session = self.context.read().await?;
        let result = page_children::<client_secret::Entity, _>(
            session.txn(),
            client_secret::Column::ClientId,
            client_secret::Column::Id,
            client_id,
            &pagination,
        )
        .await;
        session.finish(result).await
    }

    async fn get_client_secret(&self, secret_id: EntityId) -> RepoResult<Option<ClientSecret>> {
        let session = self.context.read().await?;
        let result = client_secret::Entity::find_by_id(secret_id)
            .one(session.txn())
            .await
            .map(|m| m.map(ClientSecret::from))
            .map_err(map_db_err);
        session.finish(result).await
    }

    async fn add_client_secret(&self, client_id: EntityId, secret: &ClientSecret) -> RepoResult<EntityId> {
        debug!(client_id, "Adding client secret");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::add_child_secret(&mut session, client_id, secret).await;
        session.complete(result).await
    }

    async fn delete_client_secret(&self, secret: &ClientSecret) -> RepoResult<u64> {
        let session = self.context.write(AGGREGATE).await?;
        let result = client_secret::Entity::delete_by_id(secret.id)
            .exec(session.txn())
            .await
            .map(|r| removed(r.rows_affected))
            .map_err(map_db_err);
        session.complete(result).await
    }

    async fn get_client_claims(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientClaim>> {
        let session = self.context.read().await?;
        let result = page_children::<client_claim::Entity, _>(
            session.txn(),
            client_claim::Column::ClientId,
            client_claim::Column::Id,
            client_id,
            &pagination,
        )
        .await;
        session.finish(result).await
    }

    async fn get_client_claim(&self, claim_id: EntityId) -> RepoResult<Option<ClientClaim>> {
        let session = self.context.read().await?;
        let result = client_claim::Entity::find_by_id(claim_id)
            .one(session.txn())
            .await
            .map(|m| m.map(ClientClaim::from))
            .map_err(map_db_err);
        session.finish(result).await
    }

    async fn add_client_claim(&self, client_id: EntityId, claim: &ClientClaim) -> RepoResult<EntityId> {
        debug!(client_id, "Adding client claim");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::add_child_claim(&mut session, client_id, claim).await;
        session.complete(result).await
    }

    async fn delete_client_claim(&self, claim: &ClientClaim) -> RepoResult<u64> {
        let session = self.context.write(AGGREGATE).await?;
        let result = client_claim::Entity::delete_by_id(claim.id)
            .exec(session.txn())
            .await
            .map(|r| removed(r.rows_affected))
            .map_err(map_db_err);
        session.complete(result).await
    }

    async fn get_client_properties(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientProperty>> {
        let session = self.context.read().await?;
        let result = page_children::<client_property::Entity, _>(
            session.txn(),
            client_property::Column::ClientId,
            client_property::Column::Id,
            client_id,
            &pagination,
        )
        .await;
        session.finish(result).await
    }

    async fn get_client_property(&self, property_id: EntityId) -> RepoResult<Option<ClientProperty>> {
        let session = self.context.read().await?;
        let result = client_property::Entity::find_by_id(property_id)
            .one(session.txn())
            .await
            .map(|m| m.map(ClientProperty::from))
            .map_err(map_db_err);
        session.finish(result).await
    }

    async fn add_client_property(
        &self,
        client_id: EntityId,
        property: &ClientProperty,
    ) -> RepoResult<EntityId> {
        debug!(client_id, "Adding client property");
        let mut session = self.context.write(AGGREGATE).await?;
        let result = Self::add_child_property(&mut session, client_id, property).await;
        session.complete(result).await
    }

    async fn delete_client_property(&self, property: &ClientProperty) -> RepoResult<u64> {
        let session = self.context.write(AGGREGATE).await?;
        let result = client_property::Entity::delete_by_id(property.id)
            .exec(session.txn())
            .await
            .map(|r| removed(r.rows_affected))
            .map_err(map_db_err);
        session.complete(result).await
    }
}
