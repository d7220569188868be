//! sea-orm 错误映射
//!
//! 约束违规按 SQL 错误码识别，与 PostgreSQL 后端的映射保持一致。

use ids_errors::RepositoryError;
use sea_orm::{DbErr, SqlErr};

/// 将 `DbErr` 转换为 RepositoryError
pub fn map_db_err(err: DbErr) -> RepositoryError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => RepositoryError::conflict(format!(
            "Duplicate entry violates unique constraint: {}",
            detail
        )),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            RepositoryError::validation("Foreign key constraint violation")
        }
        _ => match err {
            DbErr::RecordNotFound(msg) => RepositoryError::not_found(msg),
            DbErr::Type(msg) => RepositoryError::internal(format!("Failed to decode row: {}", msg)),
            DbErr::ConnectionAcquire(source) => {
                RepositoryError::database(format!("Database connection unavailable: {}", source))
            }
            other => RepositoryError::database(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found() {
        let err = map_db_err(DbErr::RecordNotFound("clients".to_string()));
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn test_type_error_is_internal() {
        let err = map_db_err(DbErr::Type("expected i32".to_string()));
        assert!(matches!(err, RepositoryError::Internal(_)));
        assert!(!err.is_store_failure());
    }

    #[test]
    fn test_other_errors_are_store_failures() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(err.is_store_failure());
    }
}
