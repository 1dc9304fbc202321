use serde::{Deserialize, Serialize};

use crate::fleet::{Vehicle, VehicleId};
use crate::geo::GeoPoint;

/// A brand-new delivery described by free-text endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub pickup: String,
    pub dropoff: String,
    pub required_capacity: u8,
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

/// Which step of the fallback chain produced the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Nearest,
    LocationName,
    FirstActive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    pub vehicle_id: VehicleId,
    pub tier: MatchTier,
    /// Display distance from the pickup, when the pickup had coordinates.
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryMatch {
    Matched(DeliveryAssignment),
    Unmatched { reason: String },
}

impl DeliveryMatch {
    pub fn found(&self) -> bool {
        matches!(self, DeliveryMatch::Matched(_))
    }

    pub fn assignment(&self) -> Option<&DeliveryAssignment> {
        match self {
            DeliveryMatch::Matched(assignment) => Some(assignment),
            DeliveryMatch::Unmatched { .. } => None,
        }
    }
}

/// Pick a vehicle for a new delivery.
///
/// Tiers are tried in order: nearest capacity-eligible active vehicle to the
/// resolved pickup, then a case-insensitive pickup substring match against
/// location names, then the first active vehicle in fleet order. The last
/// tier ignores capacity; it exists to keep intake moving and is a product
/// decision, not a matching guarantee.
pub fn match_delivery(
    fleet: &[Vehicle],
    request: &DeliveryRequest,
    pickup: Option<GeoPoint>,
) -> DeliveryMatch {
    let eligible = || {
        fleet
            .iter()
            .filter(|vehicle| vehicle.is_active())
            .filter(|vehicle| vehicle.has_capacity_for(request.required_capacity))
    };

    if let Some(point) = pickup {
        let nearest = eligible()
            .map(|vehicle| (vehicle, point.degree_distance(&vehicle.position)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b));
        if let Some((vehicle, distance)) = nearest {
            return DeliveryMatch::Matched(DeliveryAssignment {
                vehicle_id: vehicle.id.clone(),
                tier: MatchTier::Nearest,
                distance_km: Some(crate::geo::degrees_to_km(distance)),
            });
        }
    }

    let needle = request.pickup.trim().to_lowercase();
    if !needle.is_empty() {
        let by_name = eligible().find(|vehicle| {
            let location = vehicle.location_name.to_lowercase();
            !location.is_empty() && (location.contains(&needle) || needle.contains(&location))
        });
        if let Some(vehicle) = by_name {
            return DeliveryMatch::Matched(DeliveryAssignment {
                vehicle_id: vehicle.id.clone(),
                tier: MatchTier::LocationName,
                distance_km: None,
            });
        }
    }

    match fleet.iter().find(|vehicle| vehicle.is_active()) {
        Some(vehicle) => DeliveryMatch::Matched(DeliveryAssignment {
            vehicle_id: vehicle.id.clone(),
            tier: MatchTier::FirstActive,
            distance_km: pickup.map(|point| point.display_km(&vehicle.position)),
        }),
        None => DeliveryMatch::Unmatched {
            reason: "no active vehicles available".to_string(),
        },
    }
}
