use std::sync::Arc;

use async_trait::async_trait;
use ids_common::{PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sea_orm::{DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use super::context::ConfigurationContext;
use super::entities::log;
use super::error_mapper::map_db_err;
use super::{page_window, search_condition};
use crate::domain::log::{LogEntry, LogRepository};

pub struct OrmLogRepository {
    context: Arc<ConfigurationContext>,
}

impl OrmLogRepository {
    pub fn new(context: Arc<ConfigurationContext>) -> Self {
        Self { context }
    }

    async fn page(txn: &DatabaseTransaction, search: &str, pagination: &Pagination) -> RepoResult<PagedResult<LogEntry>> {
        let (limit, offset) = page_window(pagination)?;
        let query = log::Entity::find().filter(search_condition(
            &[log::Column::Message, log::Column::Level, log::Column::Exception],
            search,
        ));

        let total = query.clone().count(txn).await.map_err(map_db_err)?;
        let models = query
            .order_by_desc(log::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(txn)
            .await
            .map_err(map_db_err)?;
        Ok(PagedResult::new(
            models.into_iter().map(LogEntry::from).collect(),
            total,
            pagination,
        ))
    }
}

#[async_trait]
impl UnitOfWork for OrmLogRepository {
    fn auto_save_changes(&self) -> bool {
        self.context.auto_save_changes()
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        self.context.save_changes().await
    }
}

#[async_trait]
impl LogRepository for OrmLogRepository {
    async fn get_logs(&self, search: &str, pagination: Pagination) -> RepoResult<PagedResult<LogEntry>> {
        let session = self.context.read().await?;
        let result = Self::page(session.txn(), search, &pagination).await;
        session.finish(result).await
    }
}
