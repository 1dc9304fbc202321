use serde::{Deserialize, Serialize};

use crate::fleet::VehicleId;
use crate::geo::GeoPoint;

/// Move the load of a delayed vehicle onto another truck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReallocationRequest {
    pub vehicle_id: VehicleId,
    pub required_capacity: u8,
    /// Pickup point override; defaults to the vehicle's current position.
    #[serde(default)]
    pub source: Option<GeoPoint>,
}

/// Find a responder for a vehicle with an open assistance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistanceRequest {
    pub vehicle_id: VehicleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectRequest {
    pub vehicle_id: VehicleId,
}
