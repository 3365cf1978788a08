// =============================================================================
// Application identity
// =============================================================================

/// Application name in lowercase (for identifiers and log filters)
pub const APP_NAME_LOWER: &str = "semyi";

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_CONFIG_PATH: &str = "CONFIG_PATH";
pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
pub const ENV_HOSTNAME: &str = "HOSTNAME";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DB_PATH: &str = "DB_PATH";
pub const ENV_STATIC_PATH: &str = "STATIC_PATH";
pub const ENV_DEFAULT_INTERVAL: &str = "DEFAULT_INTERVAL";
pub const ENV_DEFAULT_TIMEOUT: &str = "DEFAULT_TIMEOUT";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_DUMP_FAILURE_RESPONSE: &str = "ENABLE_DUMP_FAILURE_RESPONSE";

/// Environment variable for the log level/filter
pub const ENV_LOG: &str = "SEMYI_LOG";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_HOSTNAME: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_PATH: &str = "semyi.db";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Days of history kept by the cleanup worker unless configured otherwise
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

// =============================================================================
// Limits and tuning
// =============================================================================

/// Rows returned by the snapshot endpoint, newest first
pub const SNAPSHOT_ROW_LIMIT: u32 = 100;

/// Bounded per-subscriber queue; overflow drops the oldest results
pub const BROKER_CHANNEL_CAPACITY: usize = 256;

pub const SQLITE_MAX_CONNECTIONS: u32 = 5;
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

/// Grace period for background tasks at shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 15;

/// SSE keep-alive comment interval
pub const SSE_KEEP_ALIVE_SECS: u64 = 30;
