//! PostgreSQL 持久化后端
//!
//! 聚合读取使用一次往返的多语句批次，写入在单个事务内完成，
//! 任何一步影响行数为 0 都会整体回滚。

mod postgres_api_resource_repository;
mod postgres_client_repository;
mod postgres_identity_resource_repository;
mod postgres_log_repository;
mod postgres_persisted_grant_repository;
mod rows;
pub mod schema;

pub use postgres_api_resource_repository::PostgresApiResourceRepository;
pub use postgres_client_repository::PostgresClientRepository;
pub use postgres_identity_resource_repository::PostgresIdentityResourceRepository;
pub use postgres_log_repository::PostgresLogRepository;
pub use postgres_persisted_grant_repository::PostgresPersistedGrantRepository;

use ids_adapter_postgres::{TransactionManager, map_sqlx_error};
use ids_common::Pagination;
use ids_errors::{RepoResult, RepositoryError};
use sqlx::query_builder::Separated;
use sqlx::{PgConnection, Postgres, QueryBuilder, Transaction};
use tracing::warn;

use super::db_metrics::{WriteOutcome, record_write};

/// 直写后端不缓冲更改
pub(crate) fn unsupported_save() -> RepositoryError {
    RepositoryError::unimplemented("save_all_changes is not supported by write-through repositories")
}

/// 校验分页参数并返回 (limit, offset)
pub(crate) fn page_bounds(pagination: &Pagination) -> RepoResult<(i64, i64)> {
    pagination.bounds()
}

/// 批量插入一个子集合，集合为空时不访问数据库
///
/// 返回 `false` 表示数据库报告影响行数为 0。
pub(crate) async fn insert_rows<T, F>(
    conn: &mut PgConnection,
    table: &'static str,
    columns: &str,
    items: &[T],
    mut bind: F,
) -> RepoResult<bool>
where
    F: FnMut(&mut Separated<'_, 'static, Postgres, &'static str>, &T),
{
    if items.is_empty() {
        return Ok(true);
    }

    let mut builder: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(format!("INSERT INTO {} ({}) ", table, columns));
    builder.push_values(items, |mut row, item| bind(&mut row, item));

    let affected = builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

    tracing::debug!(table, rows = affected, "Inserted child rows");
    Ok(affected > 0)
}

/// 删除某个根记录在一组子表中的全部行
pub(crate) async fn delete_children(
    conn: &mut PgConnection,
    tables: &[&'static str],
    owner_column: &str,
    owner_id: i32,
) -> RepoResult<()> {
    for table in tables {
        sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", table, owner_column))
            .bind(owner_id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// 影响行数为 0 时回滚整个写操作
pub(crate) async fn roll_back(
    tx: Transaction<'static, Postgres>,
    aggregate: &'static str,
    table: &'static str,
) -> RepoResult<()> {
    warn!(aggregate, table, "Zero rows affected, rolling back");
    TransactionManager::rollback(tx).await?;
    record_write(aggregate, WriteOutcome::RolledBack);
    Ok(())
}

/// 提交写操作
pub(crate) async fn commit(tx: Transaction<'static, Postgres>, aggregate: &'static str) -> RepoResult<()> {
    TransactionManager::commit(tx).await?;
    record_write(aggregate, WriteOutcome::Committed);
    Ok(())
}
