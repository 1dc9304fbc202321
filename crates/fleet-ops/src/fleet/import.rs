use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{DispatchStatus, HealthStatus, OperationalStatus, Vehicle, VehicleId};
use crate::geo::GeoPoint;

#[derive(Debug, thiserror::Error)]
pub enum FleetImportError {
    #[error("failed to read fleet snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fleet CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Loads a fleet snapshot from a CSV export.
pub struct FleetCsvImporter;

impl FleetCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Vehicle>, FleetImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Vehicle>, FleetImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut vehicles = Vec::new();

        for (index, record) in csv_reader.deserialize::<FleetRow>().enumerate() {
            // Header is line 1.
            let row = index + 2;
            vehicles.push(record?.into_vehicle(row)?);
        }

        Ok(vehicles)
    }
}

#[derive(Debug, Deserialize)]
struct FleetRow {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    driver: String,
    #[serde(rename = "type", default)]
    vehicle_type: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    location: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    dispatch_status: Option<String>,
    free_capacity: u8,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    health: Option<String>,
}

impl FleetRow {
    fn into_vehicle(self, row: usize) -> Result<Vehicle, FleetImportError> {
        let invalid = |message: String| FleetImportError::InvalidRow { row, message };

        if self.id.is_empty() {
            return Err(invalid("vehicle id is required".to_string()));
        }
        if self.free_capacity > 100 {
            return Err(invalid(format!(
                "free_capacity {} exceeds 100",
                self.free_capacity
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(invalid(format!(
                "coordinates ({}, {}) out of range",
                self.lat, self.lng
            )));
        }

        let status = OperationalStatus::parse(&self.status)
            .ok_or_else(|| invalid(format!("unknown status '{}'", self.status)))?;
        let health = match self.health.as_deref() {
            Some(raw) => HealthStatus::parse(raw)
                .ok_or_else(|| invalid(format!("unknown health '{raw}'")))?,
            None => HealthStatus::Normal,
        };
        let dispatch_status = match self.dispatch_status.as_deref() {
            Some(raw) => DispatchStatus::parse(raw),
            None if status == OperationalStatus::Maintenance => DispatchStatus::Maintenance,
            None => DispatchStatus::Available,
        };

        Ok(Vehicle {
            name: if self.name.is_empty() {
                self.id.clone()
            } else {
                self.name
            },
            id: VehicleId(self.id),
            driver: self.driver,
            vehicle_type: self.vehicle_type,
            position: GeoPoint::new(self.lat, self.lng),
            location_name: self.location,
            status,
            dispatch_status,
            free_capacity: self.free_capacity,
            health,
            delay: None,
            assistance: None,
            destination: None,
            route: Vec::new(),
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
