use serde::{Deserialize, Serialize};

/// Weights and conversion constants for candidate scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub distance_weight: f64,
    pub status_weight: f64,
    pub capacity_weight: f64,
    /// Points deducted from the distance score per display kilometre.
    pub distance_penalty_per_km: f64,
    pub average_speed_kmh: f64,
    /// Ceiling for the composite score; a perfect 100 is never reported.
    pub max_score: u8,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            distance_weight: 0.5,
            status_weight: 0.3,
            capacity_weight: 0.2,
            distance_penalty_per_km: 2.0,
            average_speed_kmh: 40.0,
            max_score: 99,
        }
    }
}
