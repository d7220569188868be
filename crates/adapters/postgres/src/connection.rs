//! PostgreSQL 连接管理

use ids_errors::{RepoResult, RepositoryError};
use ids_ports::ConnectionStringProvider;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// PostgreSQL 连接池配置
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// 从连接字符串提供者按名称构造配置
    pub fn from_provider(provider: &dyn ConnectionStringProvider, name: &str) -> RepoResult<Self> {
        let url = provider.connection_string(name).ok_or_else(|| {
            RepositoryError::internal(format!("Connection string '{}' is not configured", name))
        })?;
        Ok(Self::new(url.expose_secret().clone()))
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// 创建 PostgreSQL 连接池
pub async fn create_pool(config: &PostgresConfig) -> RepoResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| RepositoryError::database(format!("Failed to create pool: {}", e)))?;

    info!(
        max_connections = config.max_connections,
        "PostgreSQL connection pool created"
    );
    Ok(pool)
}

/// 检查数据库连接
pub async fn check_connection(pool: &PgPool) -> RepoResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::database(format!("Database health check failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use std::collections::HashMap;

    struct StaticStrings(HashMap<&'static str, &'static str>);

    impl ConnectionStringProvider for StaticStrings {
        fn connection_string(&self, name: &str) -> Option<Secret<String>> {
            self.0.get(name).map(|v| Secret::new(v.to_string()))
        }
    }

    #[test]
    fn test_default_config() {
        let config = PostgresConfig::new("postgres://localhost/admin").with_max_connections(4);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_from_provider() {
        let provider = StaticStrings(HashMap::from([(
            "AdminConnection",
            "postgres://user@localhost/admin",
        )]));

        let config = PostgresConfig::from_provider(&provider, "AdminConnection").unwrap();
        assert_eq!(config.url, "postgres://user@localhost/admin");

        let missing = PostgresConfig::from_provider(&provider, "Other");
        assert!(matches!(missing, Err(RepositoryError::Internal(_))));
    }
}
