use serde::{Deserialize, Serialize};

use super::domain::{HealthStatus, OperationalStatus, Vehicle};

/// List/map view filter. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetFilter {
    #[serde(default)]
    pub status: Option<OperationalStatus>,
    #[serde(default)]
    pub health: Option<HealthStatus>,
    #[serde(default)]
    pub delayed: Option<bool>,
    #[serde(default)]
    pub needs_assistance: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

impl FleetFilter {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if self.status.is_some_and(|status| vehicle.status != status) {
            return false;
        }
        if self.health.is_some_and(|health| vehicle.health != health) {
            return false;
        }
        if self.delayed.is_some_and(|delayed| vehicle.is_delayed() != delayed) {
            return false;
        }
        if self
            .needs_assistance
            .is_some_and(|needs| vehicle.needs_assistance() != needs)
        {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [
                    vehicle.id.as_str(),
                    vehicle.name.as_str(),
                    vehicle.driver.as_str(),
                    vehicle.location_name.as_str(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub maintenance: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthCounts {
    pub normal: usize,
    pub warning: usize,
    pub critical: usize,
}

/// Dashboard header figures for the whole fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub status: StatusCounts,
    pub health: HealthCounts,
    pub delayed: usize,
    pub needs_assistance: usize,
    pub average_free_capacity: f64,
}

impl FleetSummary {
    pub fn from_vehicles<'a, I>(vehicles: I) -> Self
    where
        I: IntoIterator<Item = &'a Vehicle>,
    {
        let mut summary = FleetSummary::default();
        let mut capacity_total: u64 = 0;

        for vehicle in vehicles {
            summary.total += 1;
            capacity_total += u64::from(vehicle.free_capacity);

            match vehicle.status {
                OperationalStatus::Active => summary.status.active += 1,
                OperationalStatus::Maintenance => summary.status.maintenance += 1,
                OperationalStatus::Inactive => summary.status.inactive += 1,
            }
            match vehicle.health {
                HealthStatus::Normal => summary.health.normal += 1,
                HealthStatus::Warning => summary.health.warning += 1,
                HealthStatus::Critical => summary.health.critical += 1,
            }
            if vehicle.is_delayed() {
                summary.delayed += 1;
            }
            if vehicle.needs_assistance() {
                summary.needs_assistance += 1;
            }
        }

        if summary.total > 0 {
            summary.average_free_capacity = capacity_total as f64 / summary.total as f64;
        }

        summary
    }
}
