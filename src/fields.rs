//! Enumerations and field types for test-beam preparation tasks.
//!
//! This module defines the fixed catalogs a task draws from: the detector
//! sub-systems, task status and priority. Each type knows its display label,
//! which is also the form the value takes in the backing store.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detector or campaign area a task belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubSystem {
    #[serde(rename = "HV")]
    #[value(name = "hv")]
    Hv,
    #[serde(rename = "LV")]
    #[value(name = "lv")]
    Lv,
    #[serde(rename = "DAQ/monitoring")]
    #[value(name = "daq")]
    DaqMonitoring,
    #[serde(rename = "Time reference")]
    TimeReference,
    #[serde(rename = "MCP")]
    #[value(name = "mcp")]
    Mcp,
    Electronics,
    Cooling,
    Trigger,
    Beamline,
    #[serde(rename = "Mechanics/Prototype")]
    #[value(name = "mechanics")]
    MechanicsPrototype,
    Planning,
}

impl SubSystem {
    /// Every sub-system, in catalog order.
    pub const ALL: [SubSystem; 11] = [
        SubSystem::Hv,
        SubSystem::Lv,
        SubSystem::DaqMonitoring,
        SubSystem::TimeReference,
        SubSystem::Mcp,
        SubSystem::Electronics,
        SubSystem::Cooling,
        SubSystem::Trigger,
        SubSystem::Beamline,
        SubSystem::MechanicsPrototype,
        SubSystem::Planning,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubSystem::Hv => "HV",
            SubSystem::Lv => "LV",
            SubSystem::DaqMonitoring => "DAQ/monitoring",
            SubSystem::TimeReference => "Time reference",
            SubSystem::Mcp => "MCP",
            SubSystem::Electronics => "Electronics",
            SubSystem::Cooling => "Cooling",
            SubSystem::Trigger => "Trigger",
            SubSystem::Beamline => "Beamline",
            SubSystem::MechanicsPrototype => "Mechanics/Prototype",
            SubSystem::Planning => "Planning",
        }
    }
}

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    #[serde(rename = "Not Started", alias = "Not started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done", alias = "Closed")]
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Done];

    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

/// Priority classification for task importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// A label that does not belong to the catalog it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {catalog} '{label}'")]
pub struct UnknownLabel {
    pub catalog: &'static str,
    pub label: String,
}

impl FromStr for SubSystem {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SubSystem::ALL
            .into_iter()
            .find(|sub| sub.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLabel { catalog: "sub-system", label: s.to_string() })
    }
}

impl FromStr for Status {
    type Err = UnknownLabel;

    /// Accepts the labels of both dashboard generations ("Not started"/"Closed").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not started" | "not-started" => Ok(Status::NotStarted),
            "in progress" | "in-progress" => Ok(Status::InProgress),
            "done" | "closed" => Ok(Status::Done),
            _ => Err(UnknownLabel { catalog: "status", label: s.to_string() }),
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel { catalog: "priority", label: s.to_string() })
    }
}

impl fmt::Display for SubSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_parse_back() {
        for sub in SubSystem::ALL {
            assert_eq!(sub.label().parse::<SubSystem>(), Ok(sub));
        }
        assert_eq!("daq/MONITORING".parse::<SubSystem>(), Ok(SubSystem::DaqMonitoring));
        assert!("Magnet".parse::<SubSystem>().is_err());
    }

    #[test]
    fn test_legacy_status_labels() {
        assert_eq!("Not started".parse::<Status>(), Ok(Status::NotStarted));
        assert_eq!("Closed".parse::<Status>(), Ok(Status::Done));
        assert_eq!("In Progress".parse::<Status>(), Ok(Status::InProgress));
        assert!("Open".parse::<Status>().is_err());
    }

    #[test]
    fn test_unknown_label_message() {
        let err = "Urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.to_string(), "unknown priority 'Urgent'");
        let err: Box<dyn std::error::Error> = Box::new(err);
        assert!(err.source().is_none());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&SubSystem::MechanicsPrototype).unwrap();
        assert_eq!(json, "\"Mechanics/Prototype\"");
        let status: Status = serde_json::from_str("\"Not started\"").unwrap();
        assert_eq!(status, Status::NotStarted);
    }
}
