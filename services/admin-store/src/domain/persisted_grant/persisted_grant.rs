use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持久化授权
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrant {
    pub key: String,
    pub grant_type: String,
    pub subject_id: String,
    pub client_id: String,
    pub creation_time: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
    pub data: String,
}

/// 拥有授权的主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrantSubject {
    pub subject_id: String,
    pub grant_count: i64,
}
