use super::config::MatchingConfig;
use crate::fleet::{DispatchStatus, OperationalStatus, Vehicle};
use crate::geo::KM_PER_DEGREE;

pub(crate) const PASSED_CAPACITY_SCORE: u8 = 100;

/// Suitability out of 100 for the status a candidate presents. Vehicles that
/// are out of service are looked up as maintenance (or unknown when inactive)
/// regardless of their last dispatch state.
pub(crate) fn status_suitability(vehicle: &Vehicle) -> u8 {
    let status = match vehicle.status {
        OperationalStatus::Active => vehicle.dispatch_status,
        OperationalStatus::Maintenance => DispatchStatus::Maintenance,
        OperationalStatus::Inactive => DispatchStatus::Unknown,
    };

    match status {
        DispatchStatus::Available => 100,
        DispatchStatus::Partial => 70,
        DispatchStatus::EnRoute => 30,
        DispatchStatus::Maintenance | DispatchStatus::Unknown => 0,
    }
}

/// Hard admission filter: strictly less free capacity than required rejects.
pub(crate) fn passes_capacity_gate(vehicle: &Vehicle, required_capacity: u8) -> bool {
    vehicle.has_capacity_for(required_capacity)
}

/// Closer is higher; clipped at zero for far candidates.
pub(crate) fn distance_score(distance_km: f64, config: &MatchingConfig) -> f64 {
    (100.0 - distance_km * config.distance_penalty_per_km).max(0.0)
}

pub(crate) fn composite_score(
    distance_score: f64,
    status_score: u8,
    capacity_score: u8,
    config: &MatchingConfig,
) -> u8 {
    let weighted = distance_score * config.distance_weight
        + f64::from(status_score) * config.status_weight
        + f64::from(capacity_score) * config.capacity_weight;
    let rounded = weighted.round().clamp(0.0, f64::from(config.max_score));
    rounded as u8
}

/// Minutes to cover a raw degree distance at the configured average speed.
pub(crate) fn eta_minutes(distance_degrees: f64, config: &MatchingConfig) -> u32 {
    if config.average_speed_kmh <= 0.0 {
        return 0;
    }
    let minutes = distance_degrees * KM_PER_DEGREE / config.average_speed_kmh * 60.0;
    minutes.round().max(0.0) as u32
}
