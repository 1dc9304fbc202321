use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Identifier wrapper for fleet members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the vehicle is in service at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Active,
    Maintenance,
    Inactive,
}

impl OperationalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OperationalStatus::Active => "active",
            OperationalStatus::Maintenance => "maintenance",
            OperationalStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "maintenance" => Some(Self::Maintenance),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Load/assignment state used by the candidate status lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Available,
    Partial,
    EnRoute,
    Maintenance,
    #[serde(other)]
    Unknown,
}

impl DispatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DispatchStatus::Available => "available",
            DispatchStatus::Partial => "partial",
            DispatchStatus::EnRoute => "en_route",
            DispatchStatus::Maintenance => "maintenance",
            DispatchStatus::Unknown => "unknown",
        }
    }

    /// Lenient parse; anything unrecognised becomes `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' '], "_")
            .as_str()
        {
            "available" => Self::Available,
            "partial" | "partially_loaded" => Self::Partial,
            "en_route" | "enroute" => Self::EnRoute,
            "maintenance" => Self::Maintenance,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Normal,
    Warning,
    Critical,
}

impl HealthStatus {
    pub const fn label(self) -> &'static str {
        match self {
            HealthStatus::Normal => "normal",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" | "ok" => Some(Self::Normal),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayInfo {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistanceDispatch {
    Requested,
    Dispatched,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistanceInfo {
    pub issue: Option<String>,
    pub dispatch: AssistanceDispatch,
    pub responder: Option<VehicleId>,
}

/// A single fleet member as held by the fleet store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub driver: String,
    pub vehicle_type: String,
    pub position: GeoPoint,
    pub location_name: String,
    pub status: OperationalStatus,
    pub dispatch_status: DispatchStatus,
    /// Free cargo capacity as a percentage (0-100).
    pub free_capacity: u8,
    pub health: HealthStatus,
    pub delay: Option<DelayInfo>,
    pub assistance: Option<AssistanceInfo>,
    pub destination: Option<String>,
    #[serde(default)]
    pub route: Vec<GeoPoint>,
}

impl Vehicle {
    pub fn is_active(&self) -> bool {
        self.status == OperationalStatus::Active
    }

    pub fn is_delayed(&self) -> bool {
        self.delay.is_some()
    }

    /// True while a stranded vehicle is still waiting for help to finish.
    pub fn needs_assistance(&self) -> bool {
        self.assistance
            .as_ref()
            .is_some_and(|info| info.dispatch != AssistanceDispatch::Completed)
    }

    pub fn has_capacity_for(&self, required: u8) -> bool {
        self.free_capacity >= required
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePriority {
    Low,
    #[default]
    Normal,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrderRequest {
    pub issue: String,
    #[serde(default)]
    pub priority: ServicePriority,
}

/// Maintenance work order raised against a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: String,
    pub vehicle_id: VehicleId,
    pub issue: String,
    pub priority: ServicePriority,
    pub created_at: DateTime<Utc>,
}
