//! 数据库错误映射工具
//!
//! 提供统一的 SQLx 错误到 RepositoryError 的转换

use ids_errors::RepositoryError;

/// 将 SQLx 错误转换为 RepositoryError，区分不同错误类型
pub fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::RowNotFound => RepositoryError::not_found("Record not found"),
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    // PostgreSQL 约束违规代码
                    "23505" => RepositoryError::conflict(format!(
                        "Duplicate entry violates unique constraint: {}",
                        db_err
                    )),
                    "23503" => RepositoryError::validation("Foreign key constraint violation"),
                    "23514" => RepositoryError::validation("Check constraint violation"),
                    "23502" => RepositoryError::validation("Not null constraint violation"),
                    "22001" => RepositoryError::validation("String data too long"),
                    _ => RepositoryError::database(format!(
                        "Database error ({}): {}",
                        code, db_err
                    )),
                }
            } else {
                RepositoryError::database(db_err.to_string())
            }
        }
        sqlx::Error::PoolTimedOut => RepositoryError::database("Database connection pool timeout"),
        sqlx::Error::PoolClosed => RepositoryError::database("Database connection pool is closed"),
        sqlx::Error::ColumnDecode { index, source } => RepositoryError::internal(format!(
            "Failed to decode column {}: {}",
            index, source
        )),
        sqlx::Error::Decode(source) => {
            RepositoryError::internal(format!("Failed to decode row: {}", source))
        }
        _ => RepositoryError::database(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn test_pool_timeout_is_store_failure() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(err.is_store_failure());
    }

    #[test]
    fn test_column_decode() {
        let err = map_sqlx_error(sqlx::Error::ColumnDecode {
            index: "client_id".to_string(),
            source: "bad utf-8".into(),
        });
        assert!(matches!(err, RepositoryError::Internal(_)));
    }

    #[test]
    fn test_row_decode_is_internal() {
        let err = map_sqlx_error(sqlx::Error::Decode("unknown TokenUsage value: 7".into()));
        assert!(matches!(err, RepositoryError::Internal(_)));
    }
}
