//! admin-store 入口
//!
//! 加载配置、初始化日志、连接数据库并应用结构迁移

use std::sync::Arc;
use std::time::Duration;

use admin_store::domain::catalog::Catalog;
use admin_store::domain::client::ClientRepository;
use admin_store::infrastructure::persistence::{PostgresClientRepository, schema};
use anyhow::{Context, bail};
use ids_adapter_postgres::{MigrationManager, PostgresConfig, check_connection, create_pool};
use ids_common::Pagination;
use ids_config::{ADMIN_CONNECTION, AdminConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdminConfig::load("config").context("Failed to load configuration")?;

    ids_telemetry::init(
        &config.telemetry.log_level,
        config.telemetry.json || config.is_production(),
    );
    if let Err(e) = ids_telemetry::init_metrics() {
        warn!("Metrics recorder not installed: {}", e);
    }

    info!(app_name = %config.app_name, app_env = %config.app_env, "Starting admin store");

    let pg_config = PostgresConfig::from_provider(&config, ADMIN_CONNECTION)?
        .with_max_connections(config.database.max_connections)
        .with_min_connections(config.database.min_connections)
        .with_connect_timeout(Duration::from_secs(config.database.acquire_timeout_secs));
    let pool = create_pool(&pg_config).await?;
    check_connection(&pool).await?;
    info!(
        "PostgreSQL connection pool created (max_connections: {})",
        config.database.max_connections
    );

    let result = MigrationManager::new(pool.clone())
        .migrate(&schema::migrations())
        .await?;
    if !result.is_success() {
        for error in &result.errors {
            warn!(version = error.version, name = %error.name, "Migration failed: {}", error.error);
        }
        bail!("{} migration(s) failed", result.errors.len());
    }
    info!(
        applied = result.applied_count(),
        skipped = result.skipped.len(),
        "Schema migrations completed"
    );

    let clients = PostgresClientRepository::new(pool, Arc::new(Catalog::standard()));
    let page = clients
        .get_clients("", Pagination::new(1, config.paging.default_page_size))
        .await?;
    info!(clients = page.total, "Admin store ready");

    Ok(())
}
