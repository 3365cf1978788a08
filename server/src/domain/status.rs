//! Monitor status enum
//!
//! The ordinal values are persisted and averaged by the aggregate worker, so
//! they must never be reordered or renumbered.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MonitorStatus {
    Success = 0,
    Failure = 1,
    DegradedPerformance = 2,
    UnderMaintenance = 3,
    LimitedAvailability = 4,
}

impl MonitorStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            MonitorStatus::Success
        } else {
            MonitorStatus::Failure
        }
    }

    /// Interpret the rounded mean of a bucket's ordinals as a status.
    /// Lossy, but coherent in practice because success and failure dominate.
    pub fn from_mean(mean: f64) -> Self {
        let ordinal = mean.round().clamp(0.0, 4.0) as u8;
        MonitorStatus::try_from(ordinal).unwrap_or(MonitorStatus::Failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MonitorStatus::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MonitorStatus::Success => "Success",
            MonitorStatus::Failure => "Failure",
            MonitorStatus::DegradedPerformance => "Degraded Performance",
            MonitorStatus::UnderMaintenance => "Under Maintenance",
            MonitorStatus::LimitedAvailability => "Limited Availability",
        }
    }
}

impl From<MonitorStatus> for u8 {
    fn from(status: MonitorStatus) -> Self {
        status as u8
    }
}

impl TryFrom<u8> for MonitorStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MonitorStatus::Success),
            1 => Ok(MonitorStatus::Failure),
            2 => Ok(MonitorStatus::DegradedPerformance),
            3 => Ok(MonitorStatus::UnderMaintenance),
            4 => Ok(MonitorStatus::LimitedAvailability),
            other => Err(format!("invalid monitor status: {}", other)),
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
