//! Time bucketing for aggregation
//!
//! Aggregate buckets are aligned to wall-clock hours and days in a
//! configurable timezone. The default follows the process-local zone;
//! deployments that may move across zones should configure `utc`.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

/// Normalize a timestamp to UTC before it is persisted.
pub fn ensure_utc<Tz: TimeZone>(ts: DateTime<Tz>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

/// Timezone used for aggregate bucket boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketZone {
    Local,
    Utc,
    Named(chrono_tz::Tz),
}

impl Default for BucketZone {
    fn default() -> Self {
        BucketZone::Local
    }
}

impl FromStr for BucketZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BucketZone::Local),
            "utc" => Ok(BucketZone::Utc),
            _ => s
                .parse::<chrono_tz::Tz>()
                .map(BucketZone::Named)
                .map_err(|_| format!("unknown timezone: {}", s)),
        }
    }
}

impl std::fmt::Display for BucketZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketZone::Local => write!(f, "local"),
            BucketZone::Utc => write!(f, "utc"),
            BucketZone::Named(tz) => write!(f, "{}", tz),
        }
    }
}

impl BucketZone {
    /// Start of the wall-clock hour containing `now`, as a UTC instant.
    pub fn floor_hour(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BucketZone::Local => floor_in(&Local, now, true),
            BucketZone::Utc => floor_in(&Utc, now, true),
            BucketZone::Named(tz) => floor_in(tz, now, true),
        }
    }

    /// Start of the wall-clock day containing `now`, as a UTC instant.
    pub fn floor_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BucketZone::Local => floor_in(&Local, now, false),
            BucketZone::Utc => floor_in(&Utc, now, false),
            BucketZone::Named(tz) => floor_in(tz, now, false),
        }
    }
}

fn floor_in<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>, keep_hour: bool) -> DateTime<Utc> {
    let wall = now.with_timezone(tz);
    let hour = if keep_hour { wall.hour() } else { 0 };
    tz.with_ymd_and_hms(wall.year(), wall.month(), wall.day(), hour, 0, 0)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // A DST gap swallowed the wall-clock boundary; fall back to UTC alignment.
        .unwrap_or_else(|| {
            let utc = now;
            let hour = if keep_hour { utc.hour() } else { 0 };
            Utc.with_ymd_and_hms(utc.year(), utc.month(), utc.day(), hour, 0, 0)
                .unwrap()
        })
}
