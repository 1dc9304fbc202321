//! Geographic primitives and the external location collaborators.
//!
//! Distances here are planar: Euclidean distance over raw latitude/longitude
//! degrees, scaled by [`KM_PER_DEGREE`] for display. This is not geodesic and
//! will drift away from the reference latitude; ranking depends on it, so any
//! switch to Haversine has to be a deliberate change.

pub mod geocoding;
pub mod known_locations;
pub mod routing;

use serde::{Deserialize, Serialize};

/// Approximate kilometres per degree at the reference latitude.
pub const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Straight-line distance in degrees.
    pub fn degree_distance(&self, other: &GeoPoint) -> f64 {
        let dlat = self.lat - other.lat;
        let dlng = self.lng - other.lng;
        (dlat * dlat + dlng * dlng).sqrt()
    }

    pub fn display_km(&self, other: &GeoPoint) -> f64 {
        degrees_to_km(self.degree_distance(other))
    }
}

pub fn degrees_to_km(degrees: f64) -> f64 {
    degrees * KM_PER_DEGREE
}

pub use geocoding::{GeocodeError, Geocoder, LocationResolver, NominatimGeocoder};
pub use known_locations::KnownLocations;
pub use routing::{
    plan_route, DirectRouteProvider, OsrmRouteProvider, RoutePlan, RouteProvider, RouteSource,
    RoutingError,
};
