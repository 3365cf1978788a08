//! Incident reports submitted through the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IncidentSeverity {
    Informational = 0,
    Warning = 1,
    Error = 2,
    Fatal = 3,
}

impl From<IncidentSeverity> for u8 {
    fn from(severity: IncidentSeverity) -> Self {
        severity as u8
    }
}

impl TryFrom<u8> for IncidentSeverity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(IncidentSeverity::Informational),
            1 => Ok(IncidentSeverity::Warning),
            2 => Ok(IncidentSeverity::Error),
            3 => Ok(IncidentSeverity::Fatal),
            other => Err(format!("invalid incident severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IncidentStatus {
    Investigating = 0,
    Identified = 1,
    Monitoring = 2,
    Resolved = 3,
    Scheduled = 4,
}

impl From<IncidentStatus> for u8 {
    fn from(status: IncidentStatus) -> Self {
        status as u8
    }
}

impl TryFrom<u8> for IncidentStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(IncidentStatus::Investigating),
            1 => Ok(IncidentStatus::Identified),
            2 => Ok(IncidentStatus::Monitoring),
            3 => Ok(IncidentStatus::Resolved),
            4 => Ok(IncidentStatus::Scheduled),
            other => Err(format!("invalid incident status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub monitor_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    #[serde(default)]
    pub created_by: String,
}

impl Incident {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();

        if self.monitor_id.is_empty() {
            err.add_issue("monitor_id", "monitor id is required");
        }
        if self.title.is_empty() {
            err.add_issue("title", "title is required");
        }

        err.into_result()
    }

    /// Status that actually gets stored: incidents dated in the future are
    /// always recorded as scheduled, whatever the submitter claimed.
    pub fn effective_status(&self, now: DateTime<Utc>) -> IncidentStatus {
        if self.timestamp > now {
            IncidentStatus::Scheduled
        } else {
            self.status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn incident(status: IncidentStatus) -> Incident {
        Incident {
            monitor_id: "m1".to_string(),
            title: "Elevated error rate".to_string(),
            description: String::new(),
            timestamp: Utc::now(),
            severity: IncidentSeverity::Warning,
            status,
            created_by: "ops".to_string(),
        }
    }

    #[test]
    fn test_future_incident_is_scheduled() {
        let now = Utc::now();
        let mut i = incident(IncidentStatus::Investigating);
        i.timestamp = now + Duration::hours(1);
        assert_eq!(i.effective_status(now), IncidentStatus::Scheduled);
    }

    #[test]
    fn test_past_incident_keeps_status() {
        let now = Utc::now();
        let mut i = incident(IncidentStatus::Monitoring);
        i.timestamp = now - Duration::minutes(5);
        assert_eq!(i.effective_status(now), IncidentStatus::Monitoring);
    }

    #[test]
    fn test_validation_requires_fields() {
        let mut i = incident(IncidentStatus::Investigating);
        i.monitor_id = String::new();
        i.title = String::new();
        let err = i.validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_enums_round_trip_as_numbers() {
        let i = incident(IncidentStatus::Resolved);
        let json = serde_json::to_value(&i).unwrap();
        assert_eq!(json["severity"], 1);
        assert_eq!(json["status"], 3);
        let back: Incident = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, IncidentStatus::Resolved);
    }

    #[test]
    fn test_invalid_severity_rejected() {
        let result: Result<IncidentSeverity, _> = serde_json::from_str("9");
        assert!(result.is_err());
    }
}
