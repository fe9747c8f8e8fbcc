//! Configuration management

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_JWT_EXPIRY_HOURS, DEFAULT_LOG_FILTER, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
    DEFAULT_REAPER_INTERVAL_SECONDS, ENV_PREFIX, MEMORY_DATABASE_URL,
};
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub storage: StorageSettings,
    pub reaper: ReaperSettings,
    pub policy: PolicySettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(MEMORY_DATABASE_URL)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub expiry_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Root of the blob area, one sub-directory per group.
    pub root: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReaperSettings {
    pub enabled: bool,
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicySettings {
    pub user_deletion: UserDeletionPolicy,
}

/// What happens to memberships and owned groups when a user is deleted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserDeletionPolicy {
    #[default]
    Retain,
    Cascade,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl AppConfig {
    /// Defaults, then `config/default`, then `config/{APP_ENV}`, then `USHARE__*` env vars.
    pub fn load() -> Result<Self, AppError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Defaults overlaid with an inline TOML document. No file or env lookup.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", DEFAULT_PORT)?
            .set_default("app.name", "ushare-server")?
            .set_default("database.url", MEMORY_DATABASE_URL)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout_seconds", 3)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.issuer", "ushare")?
            .set_default("jwt.expiry_hours", DEFAULT_JWT_EXPIRY_HOURS)?
            .set_default("storage.root", "./data/groups")?
            .set_default("storage.max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as u64)?
            .set_default("reaper.enabled", true)?
            .set_default("reaper.interval_seconds", DEFAULT_REAPER_INTERVAL_SECONDS)?
            .set_default("policy.user_deletion", "retain")?
            .set_default("log.level", DEFAULT_LOG_FILTER)?
            .set_default("log.format", "json")
    }
}
