//! 日志查看

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ids_common::{PagedResult, Pagination};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use serde::{Deserialize, Serialize};

/// 日志表中的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub message: Option<String>,
    pub message_template: Option<String>,
    pub level: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub exception: Option<String>,
    pub log_event: Option<String>,
    pub properties: Option<String>,
}

/// 日志仓储接口
#[async_trait]
pub trait LogRepository: UnitOfWork {
    /// 在 message / level / exception 中搜索，按 id 倒序分页
    async fn get_logs(&self, search: &str, pagination: Pagination) -> RepoResult<PagedResult<LogEntry>>;
}
