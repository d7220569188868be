//! sea-orm 数据上下文
//!
//! 每次写操作在一个 `DatabaseTransaction` 中执行。关闭自动保存时，
//! 写操作改为在一个长事务的保存点中执行，直到 `save_changes` 提交或 `discard_changes` 回滚。

use std::collections::HashSet;

use ids_errors::RepoResult;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    EntityTrait, Schema, TransactionTrait,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::convert::{log_active, persisted_grant_active};
use super::entities::*;
use super::error_mapper::map_db_err;
use crate::domain::log::LogEntry;
use crate::domain::persisted_grant::PersistedGrant;
use crate::infrastructure::db_metrics::{WriteOutcome, record_write};

/// 写操作结果
pub enum Outcome<T> {
    /// 提交事务
    Commit(T),
    /// 回滚事务，附带影响行数为 0 的表
    Rollback(&'static str, T),
    /// 没有任何更改
    Unchanged(T),
}

#[derive(Default)]
struct State {
    pending: Option<DatabaseTransaction>,
    pending_writes: usize,
    faults: HashSet<String>,
}

/// 一次读写操作：持有上下文锁与本次操作的事务
pub struct Session<'a> {
    state: MutexGuard<'a, State>,
    txn: DatabaseTransaction,
    aggregate: &'static str,
    buffered: bool,
}

impl Session<'_> {
    pub fn txn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// 报告写入某表的影响行数，注入的故障会让下一次写入返回 0
    pub fn affected(&mut self, table: &'static str, rows: u64) -> u64 {
        if rows > 0 && self.state.faults.remove(table) {
            debug!(table, "Injected zero-row fault triggered");
            0
        } else {
            rows
        }
    }

    /// 按写操作结果提交或回滚；出错时回滚并原样返回错误
    pub async fn complete<T>(self, result: RepoResult<Outcome<T>>) -> RepoResult<T> {
        let Session {
            mut state,
            txn,
            aggregate,
            buffered,
        } = self;

        match result {
            Ok(Outcome::Commit(value)) => {
                txn.commit().await.map_err(map_db_err)?;
                if buffered {
                    state.pending_writes += 1;
                }
                record_write(aggregate, WriteOutcome::Committed);
                Ok(value)
            }
            Ok(Outcome::Rollback(table, value)) => {
                warn!(aggregate, table, "Zero rows affected, rolling back");
                txn.rollback().await.map_err(map_db_err)?;
                record_write(aggregate, WriteOutcome::RolledBack);
                Ok(value)
            }
            Ok(Outcome::Unchanged(value)) => {
                txn.commit().await.map_err(map_db_err)?;
                Ok(value)
            }
            Err(err) => {
                debug!(aggregate, error = %err, "Operation failed, rolling back");
                if let Err(rollback) = txn.rollback().await {
                    warn!(aggregate, error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// 结束只读操作
    pub async fn finish<T>(self, result: RepoResult<T>) -> RepoResult<T> {
        self.complete(result.map(Outcome::Unchanged)).await
    }
}

/// 建立连接池
pub async fn connect(url: &str, max_connections: u32) -> RepoResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.max_connections(max_connections).sqlx_logging(false);
    let db = Database::connect(options).await.map_err(map_db_err)?;
    info!(backend = ?db.get_database_backend(), "Connected configuration context");
    Ok(db)
}

/// 数据上下文，可被多个仓储共享
pub struct ConfigurationContext {
    db: DatabaseConnection,
    state: Mutex<State>,
    auto_save_changes: bool,
}

impl ConfigurationContext {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_auto_save_changes(db, true)
    }

    pub fn with_auto_save_changes(db: DatabaseConnection, auto_save_changes: bool) -> Self {
        Self {
            db,
            state: Mutex::new(State::default()),
            auto_save_changes,
        }
    }

    pub fn auto_save_changes(&self) -> bool {
        self.auto_save_changes
    }

    /// 按实体定义建表（已存在的表保持不变）
    ///
    /// PostgreSQL 部署使用迁移建表，这里用于嵌入式存储。
    pub async fn create_schema(&self) -> RepoResult<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let statements = [
            schema.create_table_from_entity(client::Entity),
            schema.create_table_from_entity(client_scope::Entity),
            schema.create_table_from_entity(client_grant_type::Entity),
            schema.create_table_from_entity(client_redirect_uri::Entity),
            schema.create_table_from_entity(client_cors_origin::Entity),
            schema.create_table_from_entity(client_idp_restriction::Entity),
            schema.create_table_from_entity(client_post_logout_redirect_uri::Entity),
            schema.create_table_from_entity(client_secret::Entity),
            schema.create_table_from_entity(client_claim::Entity),
            schema.create_table_from_entity(client_property::Entity),
            schema.create_table_from_entity(api_resource::Entity),
            schema.create_table_from_entity(api_resource_claim::Entity),
            schema.create_table_from_entity(api_secret::Entity),
            schema.create_table_from_entity(api_scope::Entity),
            schema.create_table_from_entity(api_scope_claim::Entity),
            schema.create_table_from_entity(identity_resource::Entity),
            schema.create_table_from_entity(identity_claim::Entity),
            schema.create_table_from_entity(persisted_grant::Entity),
            schema.create_table_from_entity(log::Entity),
        ];

        for mut statement in statements {
            statement.if_not_exists();
            self.db.execute(backend.build(&statement)).await.map_err(map_db_err)?;
        }
        debug!("Configuration schema ready");
        Ok(())
    }

    async fn open(&self, aggregate: &'static str, write: bool) -> RepoResult<Session<'_>> {
        let mut state = self.state.lock().await;
        let buffered = write && !self.auto_save_changes;
        if buffered && state.pending.is_none() {
            debug!("Opening pending changes transaction");
            state.pending = Some(self.db.begin().await.map_err(map_db_err)?);
        }

        let txn = match &state.pending {
            Some(pending) => pending.begin().await,
            None => self.db.begin().await,
        }
        .map_err(map_db_err)?;

        Ok(Session {
            state,
            txn,
            aggregate,
            buffered,
        })
    }

    /// 开始一次写操作
    pub async fn write(&self, aggregate: &'static str) -> RepoResult<Session<'_>> {
        self.open(aggregate, true).await
    }

    /// 开始一次读操作，可以看到待保存的更改
    pub async fn read(&self) -> RepoResult<Session<'_>> {
        self.open("read", false).await
    }

    /// 让下一次写入 `table` 的操作报告影响行数为 0
    pub async fn inject_zero_rows(&self, table: &str) {
        self.state.lock().await.faults.insert(table.to_string());
    }

    /// 待保存的写操作数量
    pub async fn pending_changes(&self) -> usize {
        self.state.lock().await.pending_writes
    }

    /// 保存全部待保存更改，返回保存的写操作数量
    pub async fn save_changes(&self) -> RepoResult<usize> {
        let mut state = self.state.lock().await;
        let saved = std::mem::take(&mut state.pending_writes);
        if let Some(pending) = state.pending.take() {
            pending.commit().await.map_err(map_db_err)?;
        }
        debug!(saved, "Saved pending changes");
        Ok(saved)
    }

    /// 丢弃全部待保存更改
    pub async fn discard_changes(&self) -> RepoResult<()> {
        let mut state = self.state.lock().await;
        state.pending_writes = 0;
        if let Some(pending) = state.pending.take() {
            pending.rollback().await.map_err(map_db_err)?;
            debug!("Discarded pending changes");
        }
        Ok(())
    }

    /// 写入一条持久化授权
    pub async fn add_persisted_grant(&self, grant: PersistedGrant) -> RepoResult<()> {
        let session = self.write("persisted_grant").await?;
        let result = persisted_grant::Entity::insert(persisted_grant_active(grant))
            .exec_without_returning(session.txn())
            .await
            .map(|_| Outcome::Commit(()))
            .map_err(map_db_err);
        session.complete(result).await
    }

    /// 写入一条日志，返回其标识
    pub async fn add_log(&self, entry: LogEntry) -> RepoResult<i64> {
        let session = self.write("log").await?;
        let result = log_active(entry)
            .insert(session.txn())
            .await
            .map(|model| Outcome::Commit(model.id))
            .map_err(map_db_err);
        session.complete(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::PaginatorTrait;
    use tempfile::NamedTempFile;

    use crate::infrastructure::tables::LOGS;

    async fn context(auto_save_changes: bool) -> (ConfigurationContext, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", file.path().display());
        let db = connect(&url, 1).await.unwrap();
        let context = ConfigurationContext::with_auto_save_changes(db, auto_save_changes);
        context.create_schema().await.unwrap();
        (context, file)
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            id: 0,
            message: Some(message.to_string()),
            message_template: None,
            level: Some("Information".to_string()),
            timestamp: Utc::now(),
            exception: None,
            log_event: None,
            properties: None,
        }
    }

    async fn log_count(context: &ConfigurationContext) -> u64 {
        let session = context.read().await.unwrap();
        let count = log::Entity::find().count(session.txn()).await.map_err(map_db_err);
        session.finish(count).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let (context, _file) = context(true).await;
        context.create_schema().await.unwrap();
        assert_eq!(log_count(&context).await, 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_rows() {
        let (context, _file) = context(true).await;
        let session = context.write("test").await.unwrap();
        let inserted = log_active(entry("discarded")).insert(session.txn()).await.map_err(map_db_err);
        let value = session
            .complete(inserted.map(|_| Outcome::Rollback(LOGS, 7)))
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(log_count(&context).await, 0);
    }

    #[tokio::test]
    async fn test_error_rolls_back_and_propagates() {
        let (context, _file) = context(true).await;
        let session = context.write("test").await.unwrap();
        log_active(entry("lost")).insert(session.txn()).await.unwrap();
        let result: RepoResult<Outcome<()>> = Err(ids_errors::RepositoryError::conflict("taken"));

        let err = session.complete(result).await.unwrap_err();
        assert!(matches!(err, ids_errors::RepositoryError::Conflict(_)));
        assert_eq!(log_count(&context).await, 0);
    }

    #[tokio::test]
    async fn test_fault_fires_once() {
        let (context, _file) = context(true).await;
        context.inject_zero_rows(LOGS).await;

        let mut session = context.write("test").await.unwrap();
        let first = session.affected(LOGS, 1);
        let second = session.affected(LOGS, 1);
        session.finish(Ok(())).await.unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }

    #[tokio::test]
    async fn test_pending_changes_until_saved() {
        let (context, _file) = context(false).await;
        context.add_log(entry("first")).await.unwrap();
        context.add_log(entry("second")).await.unwrap();

        assert_eq!(context.pending_changes().await, 2);
        assert_eq!(log_count(&context).await, 2);
        assert_eq!(context.save_changes().await.unwrap(), 2);
        assert_eq!(context.pending_changes().await, 0);
        assert_eq!(log_count(&context).await, 2);
    }

    #[tokio::test]
    async fn test_discard_changes() {
        let (context, _file) = context(false).await;
        context.add_log(entry("draft")).await.unwrap();
        context.discard_changes().await.unwrap();

        assert_eq!(context.pending_changes().await, 0);
        assert_eq!(log_count(&context).await, 0);
    }

    #[tokio::test]
    async fn test_rolled_back_write_keeps_earlier_pending_writes() {
        let (context, _file) = context(false).await;
        context.add_log(entry("kept")).await.unwrap();

        let session = context.write("test").await.unwrap();
        let inserted = log_active(entry("dropped")).insert(session.txn()).await.map_err(map_db_err);
        session.complete(inserted.map(|_| Outcome::Rollback(LOGS, ()))).await.unwrap();

        assert_eq!(context.pending_changes().await, 1);
        assert_eq!(context.save_changes().await.unwrap(), 1);
        assert_eq!(log_count(&context).await, 1);
    }
}
