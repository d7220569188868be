//! PostgreSQL 事务管理模块

use ids_errors::{RepoResult, RepositoryError};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

/// 事务管理器
///
/// 写操作都在一个本地事务内完成：要么全部提交，要么全部回滚。
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 开始事务（READ COMMITTED）
    pub async fn begin(&self) -> RepoResult<Transaction<'static, Postgres>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to begin transaction: {}", e)))?;

        debug!("Transaction started");
        Ok(tx)
    }

    /// 提交事务
    pub async fn commit(tx: Transaction<'static, Postgres>) -> RepoResult<()> {
        tx.commit()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to commit transaction: {}", e)))
    }

    /// 回滚事务
    pub async fn rollback(tx: Transaction<'static, Postgres>) -> RepoResult<()> {
        tx.rollback().await.map_err(|e| {
            RepositoryError::database(format!("Failed to rollback transaction: {}", e))
        })
    }
}
