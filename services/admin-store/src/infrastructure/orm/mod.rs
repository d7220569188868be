//! sea-orm 持久化后端
//!
//! 与 PostgreSQL 后端使用同一套表结构，写操作在 `DatabaseTransaction` 中完成，
//! 任何一步影响行数为 0 都会整体回滚。可连接 PostgreSQL，也可连接嵌入式 SQLite。

mod context;
mod convert;
pub mod entities;
mod error_mapper;
mod orm_api_resource_repository;
mod orm_client_repository;
mod orm_identity_resource_repository;
mod orm_log_repository;
mod orm_persisted_grant_repository;

pub use context::{ConfigurationContext, Outcome, Session, connect};
pub use error_mapper::map_db_err;
pub use orm_api_resource_repository::OrmApiResourceRepository;
pub use orm_client_repository::OrmClientRepository;
pub use orm_identity_resource_repository::OrmIdentityResourceRepository;
pub use orm_log_repository::OrmLogRepository;
pub use orm_persisted_grant_repository::OrmPersistedGrantRepository;

use ids_common::{EntityId, NEW_ID, PagedResult, Pagination, contains_pattern};
use ids_errors::RepoResult;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbBackend, EntityTrait, IntoActiveModel,
    PaginatorTrait, PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect,
};

use convert::ChildRow;

/// 在若干列中做不区分大小写的子串匹配；空过滤条件不加限制
pub(crate) fn search_condition<C: ColumnTrait>(columns: &[C], search: &str) -> Condition {
    if search.trim().is_empty() {
        return Condition::all();
    }

    let pattern = contains_pattern(search).to_lowercase();
    columns.iter().fold(Condition::any(), |condition, column| {
        condition.add(Expr::expr(Func::lower(Expr::col(*column))).like(LikeExpr::new(pattern.clone()).escape('\\')))
    })
}

/// 按字节序排序的列（PostgreSQL 需显式 `COLLATE "C"`）
pub(crate) fn byte_order<C: ColumnTrait>(backend: DbBackend, column: C) -> SimpleExpr {
    match backend {
        DbBackend::Postgres => Expr::cust(format!(r#""{}" COLLATE "C""#, column.as_str())),
        _ => Expr::cust(format!(r#""{}""#, column.as_str())),
    }
}

/// 升序排序时让 NULL 排在最前
pub(crate) fn nulls_first<C: ColumnTrait>(column: C) -> SimpleExpr {
    Expr::cust(format!(r#""{}" IS NOT NULL"#, column.as_str()))
}

/// 删除影响行数为 0 时不算一次写入
pub(crate) fn removed(rows: u64) -> Outcome<u64> {
    if rows > 0 {
        Outcome::Commit(rows)
    } else {
        Outcome::Unchanged(0)
    }
}

/// 校验分页参数并返回 (limit, offset)
pub(crate) fn page_window(pagination: &Pagination) -> RepoResult<(u64, u64)> {
    let (limit, offset) = pagination.bounds()?;
    Ok((limit.unsigned_abs(), offset.unsigned_abs()))
}

/// 批量插入一个子集合，集合为空时不访问数据库
///
/// 返回 `false` 表示影响行数为 0。
pub(crate) async fn insert_children<T>(
    session: &mut Session<'_>,
    table: &'static str,
    items: &[T],
    owner: EntityId,
) -> RepoResult<bool>
where
    T: ChildRow + Sync,
    <<T::Active as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<T::Active>,
{
    if items.is_empty() {
        return Ok(true);
    }

    let rows = <T::Active as ActiveModelTrait>::Entity::insert_many(items.iter().map(|item| item.active(owner)))
        .exec_without_returning(session.txn())
        .await
        .map_err(map_db_err)?;

    tracing::debug!(table, rows, "Inserted child rows");
    Ok(session.affected(table, rows) > 0)
}

/// 插入单个子项，返回新标识；影响行数为 0 时回滚
pub(crate) async fn insert_child<T>(
    session: &mut Session<'_>,
    table: &'static str,
    item: &T,
    owner: EntityId,
) -> RepoResult<Outcome<EntityId>>
where
    T: ChildRow + Sync,
    <<<T::Active as ActiveModelTrait>::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType:
        Into<EntityId>,
{
    let inserted = <T::Active as ActiveModelTrait>::Entity::insert(item.active(owner))
        .exec(session.txn())
        .await
        .map_err(map_db_err)?;

    if session.affected(table, 1) == 0 {
        return Ok(Outcome::Rollback(table, NEW_ID));
    }
    Ok(Outcome::Commit(inserted.last_insert_id.into()))
}

/// 读取某个根记录的一个子集合，按标识排序
pub(crate) async fn load_children<E, T>(
    txn: &DatabaseTransaction,
    owner_column: E::Column,
    id_column: E::Column,
    owner: EntityId,
) -> RepoResult<Vec<T>>
where
    E: EntityTrait,
    T: From<E::Model>,
{
    let models = E::find()
        .filter(owner_column.eq(owner))
        .order_by_asc(id_column)
        .all(txn)
        .await
        .map_err(map_db_err)?;
    Ok(models.into_iter().map(T::from).collect())
}

/// 分页读取某个根记录的一个子集合，总数与分页无关
pub(crate) async fn page_children<E, T>(
    txn: &DatabaseTransaction,
    owner_column: E::Column,
    id_column: E::Column,
    owner: EntityId,
    pagination: &Pagination,
) -> RepoResult<PagedResult<T>>
where
    E: EntityTrait,
    E::Model: Sync + 'static,
    T: From<E::Model>,
{
    let (limit, offset) = page_window(pagination)?;
    let query = E::find().filter(owner_column.eq(owner));
    let total = query.clone().count(txn).await.map_err(map_db_err)?;
    let models = query
        .order_by_asc(id_column)
        .limit(limit)
        .offset(offset)
        .all(txn)
        .await
        .map_err(map_db_err)?;
    Ok(PagedResult::new(models.into_iter().map(T::from).collect(), total, pagination))
}

/// 删除某个根记录在一个子表中的全部行
pub(crate) async fn delete_children<E: EntityTrait>(
    txn: &DatabaseTransaction,
    owner_column: E::Column,
    owner: EntityId,
) -> RepoResult<u64> {
    let result = E::delete_many()
        .filter(owner_column.eq(owner))
        .exec(txn)
        .await
        .map_err(map_db_err)?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ids_errors::RepositoryError;
    use sea_orm::QueryTrait;

    use entities::client;

    #[test]
    fn test_blank_search_has_no_filter() {
        let sql = client::Entity::find()
            .filter(search_condition(&[client::Column::ClientId], "  "))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("WHERE"), "{}", sql);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let sql = client::Entity::find()
            .filter(search_condition(
                &[client::Column::ClientId, client::Column::ClientName],
                "50%_Off",
            ))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("LOWER"), "{}", sql);
        assert!(sql.contains("ESCAPE"), "{}", sql);
        assert!(sql.contains("_off") && !sql.contains("Off"), "{}", sql);
        assert!(sql.contains(" OR "), "{}", sql);
    }

    #[test]
    fn test_byte_order_collates_on_postgres_only() {
        let sql = client::Entity::find()
            .order_by_asc(byte_order(DbBackend::Postgres, client::Column::ClientName))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""client_name" COLLATE "C""#), "{}", sql);

        let sql = client::Entity::find()
            .order_by_asc(byte_order(DbBackend::Sqlite, client::Column::ClientName))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("COLLATE"), "{}", sql);
    }

    #[test]
    fn test_nulls_first_orders_by_presence() {
        let sql = client::Entity::find()
            .order_by_asc(nulls_first(client::Column::ClientName))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"ORDER BY "client_name" IS NOT NULL ASC"#), "{}", sql);
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(&Pagination::new(3, 10)).unwrap(), (10, 20));
        assert!(matches!(page_window(&Pagination::new(0, 10)), Err(RepositoryError::Validation(_))));
    }
}
