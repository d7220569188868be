use std::sync::Arc;

use async_trait::async_trait;
use ids_common::{PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tracing::debug;

use super::context::ConfigurationContext;
use super::entities::persisted_grant;
use super::error_mapper::map_db_err;
use super::{byte_order, page_window, removed, search_condition};
use crate::domain::persisted_grant::{PersistedGrant, PersistedGrantRepository, PersistedGrantSubject};

const AGGREGATE: &str = "persisted_grant";

#[derive(Debug, FromQueryResult)]
struct SubjectRow {
    subject_id: String,
    grant_count: i64,
}

pub struct OrmPersistedGrantRepository {
    context: Arc<ConfigurationContext>,
}

impl OrmPersistedGrantRepository {
    pub fn new(context: Arc<ConfigurationContext>) -> Self {
        Self { context }
    }

    /// 按主体分组计数，总数为分组数
    async fn subjects(
        txn: &DatabaseTransaction,
        search: &str,
        pagination: &Pagination,
    ) -> RepoResult<PagedResult<PersistedGrantSubject>> {
        let (limit, offset) = page_window(pagination)?;
        let query = persisted_grant::Entity::find()
            .select_only()
            .column(persisted_grant::Column::SubjectId)
            .column_as(Expr::col(persisted_grant::Column::Key).count(), "grant_count")
            .filter(search_condition(&[persisted_grant::Column::SubjectId], search))
            .group_by(persisted_grant::Column::SubjectId);

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let rows = query
            .order_by_asc(byte_order(txn.get_database_backend(), persisted_grant::Column::SubjectId))
            .limit(limit)
            .offset(offset)
            .into_model::<SubjectRow>()
            .all(txn)
            .await
            .map_err(map_db_err)?;

        let items = rows
            .into_iter()
            .map(|r| PersistedGrantSubject {
                subject_id: r.subject_id,
                grant_count: r.grant_count,
            })
            .collect();
        Ok(PagedResult::new(items, total, pagination))
    }

    async fn grants_of(
        txn: &DatabaseTransaction,
        subject_id: &str,
        pagination: &Pagination,
    ) -> RepoResult<PagedResult<PersistedGrant>> {
        let (limit, offset) = page_window(pagination)?;
        let query = persisted_grant::Entity::find().filter(persisted_grant::Column::SubjectId.eq(subject_id));

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let models = query
            .order_by_desc(persisted_grant::Column::CreationTime)
            .order_by_asc(byte_order(txn.get_database_backend(), persisted_grant::Column::Key))
            .limit(limit)
            .offset(offset)
            .all(txn)
            .await
            .map_err(map_db_err)?;
        Ok(PagedResult::new(
            models.into_iter().map(PersistedGrant::from).collect(),
            total,
            pagination,
        ))
    }

    async fn has_grants(txn: &DatabaseTransaction, subject_id: &str) -> RepoResult<bool> {
        let count = persisted_grant::Entity::find()
            .filter(persisted_grant::Column::SubjectId.eq(subject_id))
            .count(txn)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl UnitOfWork for OrmPersistedGrantRepository {
    fn auto_save_changes(&self) -> bool {
        self.context.auto_save_changes()
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        self.context.save_changes().await
    }
}

#[async_trait]
impl PersistedGrantRepository for OrmPersistedGrantRepository {
    async fn get_persisted_grants_by_users(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<PersistedGrantSubject>> {
        let session = self.context.read().await?;
        let result = Self::subjects(session.txn(), search, &pagination).await;
        session.finish(result).await
    }

    async fn get_persisted_grants_by_user(
        &self,
        subject_id: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<PersistedGrant>> {
        let session = self.context.read().await?;
        let result = Self::grants_of(session.txn(), subject_id, &pagination).await;
        session.finish(result).await
    }

    async fn get_persisted_grant(&self, key: &str) -> RepoResult<Option<PersistedGrant>> {
        let session = self.context.read().await?;
        let result = persisted_grant::Entity::find_by_id(key.to_owned())
            .one(session.txn())
            .await
            .map(|m| m.map(PersistedGrant::from))
            .map_err(map_db_err);
        session.finish(result).await
    }

    async fn delete_persisted_grant(&self, key: &str) -> RepoResult<u64> {
        debug!(key, "Deleting persisted grant");
        let session = self.context.write(AGGREGATE).await?;
        let result = persisted_grant::Entity::delete_by_id(key.to_owned())
            .exec(session.txn())
            .await
            .map(|r| removed(r.rows_affected))
            .map_err(map_db_err);
        session.complete(result).await
    }

    async fn delete_persisted_grants(&self, subject_id: &str) -> RepoResult<u64> {
        debug!(subject_id, "Deleting persisted grants of subject");
        let session = self.context.write(AGGREGATE).await?;
        let result = persisted_grant::Entity::delete_many()
            .filter(persisted_grant::Column::SubjectId.eq(subject_id))
            .exec(session.txn())
            .await
            .map(|r| removed(r.rows_affected))
            .map_err(map_db_err);
        session.complete(result).await
    }

    async fn exists_persisted_grants(&self, subject_id: &str) -> RepoResult<bool> {
        let session = self.context.read().await?;
        let result = Self::has_grants(session.txn(), subject_id).await;
        session.finish(result).await
    }
}
