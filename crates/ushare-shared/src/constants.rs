//! Application-wide constants

pub const ENV_PREFIX: &str = "USHARE";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
pub const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const MEMORY_DATABASE_URL: &str = "memory://";
pub const DEFAULT_LOG_FILTER: &str = "info,ushare=debug";
