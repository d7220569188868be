use async_trait::async_trait;
use ids_adapter_postgres::map_sqlx_error;
use ids_common::{PagedResult, Pagination, contains_pattern};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sqlx::PgPool;
use tracing::debug;

use super::rows::{self, PERSISTED_GRANT_COLUMNS, decode_all};
use super::{page_bounds, unsupported_save};
use crate::domain::persisted_grant::{PersistedGrant, PersistedGrantRepository, PersistedGrantSubject};

pub struct PostgresPersistedGrantRepository {
    pool: PgPool,
}

impl PostgresPersistedGrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresPersistedGrantRepository {
    fn auto_save_changes(&self) -> bool {
        true
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        Err(unsupported_save())
    }
}

#[async_trait]
impl PersistedGrantRepository for PostgresPersistedGrantRepository {
    async fn get_persisted_grants_by_users(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<PersistedGrantSubject>> {
        debug!(search, page = pagination.page, "Listing grant subjects");
        let (limit, offset) = page_bounds(&pagination)?;
        let pattern = contains_pattern(search);

        let records = sqlx::query(
            r#"
            SELECT subject_id, COUNT(*) AS grant_count
            FROM persisted_grants
            WHERE subject_id ILIKE $1 ESCAPE '\'
            GROUP BY subject_id
            ORDER BY subject_id COLLATE "C"
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(DISTINCT subject_id) FROM persisted_grants WHERE subject_id ILIKE $1 ESCAPE '\'"#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::persisted_grant_subject).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_persisted_grants_by_user(
        &self,
        subject_id: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<PersistedGrant>> {
        let (limit, offset) = page_bounds(&pagination)?;

        let records = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM persisted_grants
            WHERE subject_id = $1
            ORDER BY creation_time DESC, key COLLATE "C"
            LIMIT $2 OFFSET $3
            "#,
            PERSISTED_GRANT_COLUMNS
        ))
        .bind(subject_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM persisted_grants WHERE subject_id = $1")
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::persisted_grant).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_persisted_grant(&self, key: &str) -> RepoResult<Option<PersistedGrant>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM persisted_grants WHERE key = $1",
            PERSISTED_GRANT_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(rows::persisted_grant).transpose().map_err(map_sqlx_error)
    }

    async fn delete_persisted_grant(&self, key: &str) -> RepoResult<u64> {
        debug!(key, "Deleting persisted grant");
        let result = sqlx::query("DELETE FROM persisted_grants WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_persisted_grants(&self, subject_id: &str) -> RepoResult<u64> {
        debug!(subject_id, "Deleting persisted grants of subject");
        let result = sqlx::query("DELETE FROM persisted_grants WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn exists_persisted_grants(&self, subject_id: &str) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM persisted_grants WHERE subject_id = $1)")
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}
