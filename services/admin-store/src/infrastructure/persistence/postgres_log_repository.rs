use async_trait::async_trait;
use ids_adapter_postgres::map_sqlx_error;
use ids_common::{PagedResult, Pagination, contains_pattern};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sqlx::PgPool;

use super::rows::{self, LOG_COLUMNS, decode_all};
use super::{page_bounds, unsupported_save};
use crate::domain::log::{LogEntry, LogRepository};
use crate::infrastructure::db_metrics::QueryTimer;
use crate::infrastructure::tables::LOGS;

const SEARCH_FILTER: &str = r#"
    COALESCE(message, '') ILIKE $1 ESCAPE '\'
    OR COALESCE(level, '') ILIKE $1 ESCAPE '\'
    OR COALESCE(exception, '') ILIKE $1 ESCAPE '\'
"#;

pub struct PostgresLogRepository {
    pool: PgPool,
}

impl PostgresLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresLogRepository {
    fn auto_save_changes(&self) -> bool {
        true
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        Err(unsupported_save())
    }
}

#[async_trait]
impl LogRepository for PostgresLogRepository {
    async fn get_logs(&self, search: &str, pagination: Pagination) -> RepoResult<PagedResult<LogEntry>> {
        let timer = QueryTimer::new(LOGS, "search");
        let (limit, offset) = page_bounds(&pagination)?;
        let pattern = contains_pattern(search);

        let records = sqlx::query(&format!(
            "SELECT {} FROM logs WHERE {} ORDER BY id DESC LIMIT $2 OFFSET $3",
            LOG_COLUMNS, SEARCH_FILTER
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM logs WHERE {}", SEARCH_FILTER))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        timer.finish();
        let items = decode_all(&records, rows::log_entry).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }
}
