//! Domain types: monitors, probe results, incidents

pub mod historical;
pub mod incident;
pub mod monitor;
pub mod pattern;
pub mod status;
pub mod validation;

pub use historical::MonitorHistorical;
pub use incident::{Incident, IncidentSeverity, IncidentStatus};
pub use monitor::{
    AlertProvider, HttpMonitor, IcmpMonitor, Monitor, MonitorType, ProbeDefaults, PublicMonitor,
};
pub use pattern::StatusPattern;
pub use status::MonitorStatus;
pub use validation::ValidationError;
