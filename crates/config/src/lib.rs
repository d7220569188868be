//! ids-config - 配置加载库

use std::collections::HashMap;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use ids_ports::ConnectionStringProvider;
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

/// 管理存储使用的连接字符串名称
pub const ADMIN_CONNECTION: &str = "AdminConnection";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Missing connection string: {0}")]
    MissingConnectionString(String),
}

/// 数据库连接池配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

fn default_max_connections() -> u32 {
    // 根据环境自动调整连接池大小
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 分页配置
#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub connection_strings: HashMap<String, Secret<String>>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub paging: PagingConfig,
}

fn default_app_name() -> String {
    "admin-store".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AdminConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 依次合并 `{dir}/default.toml`、`{dir}/{APP_ENV}.toml` 与 `ADMIN_` 前缀的环境变量，
    /// 环境变量使用 `__` 分隔嵌套键，例如 `ADMIN_CONNECTION_STRINGS__ADMINCONNECTION`。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Self::figment(config_dir, &env).extract()?;

        Ok(config)
    }

    /// 构造配置源（测试中可单独使用）
    pub fn figment(config_dir: &str, env: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("ADMIN_").split("__"))
    }

    /// 获取必需的连接字符串
    pub fn require_connection_string(&self, name: &str) -> Result<Secret<String>, ConfigError> {
        self.connection_string(name)
            .ok_or_else(|| ConfigError::MissingConnectionString(name.to_string()))
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

impl ConnectionStringProvider for AdminConfig {
    fn connection_string(&self, name: &str) -> Option<Secret<String>> {
        // 环境变量提供的键会被小写化，这里按不区分大小写查找
        self.connection_strings
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

#[cfg(test)]
mod tests;
