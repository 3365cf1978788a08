//! SQLite schema definitions
//!
//! Three history tables share one column layout so rollups can reuse the raw
//! row shape; aggregates additionally record when they were computed.
//! Uniqueness of `(monitor_id, timestamp)` on the aggregate tables is
//! maintained by the delete-then-insert writes, not by a constraint.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS monitor_historical (
    timestamp TEXT NOT NULL,
    monitor_id TEXT NOT NULL CHECK (length(monitor_id) <= 255),
    status INTEGER NOT NULL,
    latency INTEGER NOT NULL CHECK (latency >= 0),
    additional_message TEXT,
    http_protocol TEXT,
    tls_version TEXT,
    tls_cipher TEXT,
    tls_expiry TEXT
);

CREATE INDEX IF NOT EXISTS idx_monitor_historical_monitor_ts
    ON monitor_historical (monitor_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_monitor_historical_ts
    ON monitor_historical (timestamp);

CREATE TABLE IF NOT EXISTS monitor_historical_hourly_aggregate (
    timestamp TEXT NOT NULL,
    monitor_id TEXT NOT NULL CHECK (length(monitor_id) <= 255),
    status INTEGER NOT NULL,
    latency INTEGER NOT NULL CHECK (latency >= 0),
    additional_message TEXT,
    http_protocol TEXT,
    tls_version TEXT,
    tls_cipher TEXT,
    tls_expiry TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_hourly_aggregate_monitor_ts
    ON monitor_historical_hourly_aggregate (monitor_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_hourly_aggregate_ts
    ON monitor_historical_hourly_aggregate (timestamp);

CREATE TABLE IF NOT EXISTS monitor_historical_daily_aggregate (
    timestamp TEXT NOT NULL,
    monitor_id TEXT NOT NULL CHECK (length(monitor_id) <= 255),
    status INTEGER NOT NULL,
    latency INTEGER NOT NULL CHECK (latency >= 0),
    additional_message TEXT,
    http_protocol TEXT,
    tls_version TEXT,
    tls_cipher TEXT,
    tls_expiry TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_daily_aggregate_monitor_ts
    ON monitor_historical_daily_aggregate (monitor_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_daily_aggregate_ts
    ON monitor_historical_daily_aggregate (timestamp);

CREATE TABLE IF NOT EXISTS incident_data (
    monitor_id TEXT NOT NULL CHECK (length(monitor_id) <= 255),
    title TEXT NOT NULL,
    description TEXT,
    timestamp TEXT NOT NULL,
    severity INTEGER NOT NULL,
    status INTEGER NOT NULL,
    created_by TEXT
);

CREATE INDEX IF NOT EXISTS idx_incident_monitor_ts
    ON incident_data (monitor_id, timestamp);
"#;
