//! Candidate scoring and ranking.
//!
//! Scoring is a pure function of the request and a vehicle record; ranking
//! only filters and sorts, so identical snapshots always produce identical
//! lists. Rejection (capacity gate, zero score) is a normal outcome and never
//! an error.

mod config;
pub mod delivery;
mod rules;

pub use config::MatchingConfig;
pub use delivery::{match_delivery, DeliveryAssignment, DeliveryMatch, DeliveryRequest, MatchTier};

use serde::{Deserialize, Serialize};

use crate::fleet::{Vehicle, VehicleId};
use crate::geo::{degrees_to_km, GeoPoint};

/// What the engine needs to know about a transport request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub source: GeoPoint,
    /// Free capacity (percent) a candidate must have.
    pub required_capacity: u8,
    /// Vehicle the request originates from; never its own candidate.
    #[serde(default)]
    pub origin: Option<VehicleId>,
}

/// Scored projection of one vehicle against a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub vehicle_id: VehicleId,
    pub vehicle_name: String,
    pub position: GeoPoint,
    /// Raw Euclidean distance in degrees.
    pub distance: f64,
    pub distance_km: f64,
    pub distance_score: f64,
    pub status_score: u8,
    pub capacity_score: u8,
    pub score: u8,
    pub eta_minutes: u32,
}

/// Stateless scorer applying [`MatchingConfig`] to fleet records.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Score a single vehicle. `None` means rejected (score 0).
    pub fn score(&self, request: &MatchRequest, vehicle: &Vehicle) -> Option<Candidate> {
        if !rules::passes_capacity_gate(vehicle, request.required_capacity) {
            return None;
        }

        let distance = request.source.degree_distance(&vehicle.position);
        let distance_km = degrees_to_km(distance);
        let distance_score = rules::distance_score(distance_km, &self.config);
        let status_score = rules::status_suitability(vehicle);
        let capacity_score = rules::PASSED_CAPACITY_SCORE;
        let score =
            rules::composite_score(distance_score, status_score, capacity_score, &self.config);

        Some(Candidate {
            vehicle_id: vehicle.id.clone(),
            vehicle_name: vehicle.name.clone(),
            position: vehicle.position,
            distance,
            distance_km,
            distance_score,
            status_score,
            capacity_score,
            score,
            eta_minutes: rules::eta_minutes(distance, &self.config),
        })
    }

    /// Score the whole snapshot, drop zero scores, and sort best first.
    /// Equal scores keep fleet order.
    pub fn rank(&self, request: &MatchRequest, fleet: &[Vehicle]) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = fleet
            .iter()
            .filter(|vehicle| request.origin.as_ref() != Some(&vehicle.id))
            .filter_map(|vehicle| self.score(request, vehicle))
            .filter(|candidate| candidate.score > 0)
            .collect();

        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }
}
