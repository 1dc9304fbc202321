use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::known_locations::KnownLocations;
use super::GeoPoint;

/// Resolves free-text place names to a single best-guess point.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        query: &str,
        city: Option<&str>,
    ) -> Result<Option<GeoPoint>, GeocodeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned an unparseable coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

/// Nominatim `/search` client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fleet-ops/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        query: &str,
        city: Option<&str>,
    ) -> Result<Option<GeoPoint>, GeocodeError> {
        let q = match city {
            Some(city) => format!("{query}, {city}"),
            None => query.to_string(),
        };

        let mut url = Url::parse(&format!("{}/search", self.endpoint))
            .map_err(|err| GeocodeError::Unavailable(format!("invalid endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("q", &q);

        let places: Vec<NominatimPlace> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        places.into_iter().next().map(parse_place).transpose()
    }
}

fn parse_place(place: NominatimPlace) -> Result<GeoPoint, GeocodeError> {
    let lat = parse_degrees(&place.lat, 90.0)?;
    let lng = parse_degrees(&place.lon, 180.0)?;
    Ok(GeoPoint::new(lat, lng))
}

/// `NaN`, infinities and out-of-range values parse as `f64` but are not places.
fn parse_degrees(raw: &str, limit: f64) -> Result<f64, GeocodeError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() <= limit => Ok(value),
        _ => Err(GeocodeError::InvalidCoordinate(raw.to_string())),
    }
}

/// Cache-first resolver: the known-locations table is consulted before any
/// network lookup, and geocoder failures resolve to `None`.
pub struct LocationResolver {
    known: KnownLocations,
    geocoder: Option<Arc<dyn Geocoder>>,
    city: Option<String>,
}

impl LocationResolver {
    pub fn new(
        known: KnownLocations,
        geocoder: Option<Arc<dyn Geocoder>>,
        city: Option<String>,
    ) -> Self {
        Self {
            known,
            geocoder,
            city,
        }
    }

    /// Resolver that never leaves the process.
    pub fn offline(known: KnownLocations) -> Self {
        Self::new(known, None, None)
    }

    pub async fn resolve(&self, query: &str) -> Option<GeoPoint> {
        if let Some(point) = self.known.lookup(query) {
            debug!(query, "resolved from known locations");
            return Some(point);
        }

        let geocoder = self.geocoder.as_ref()?;
        match geocoder.geocode(query, self.city.as_deref()).await {
            Ok(Some(point)) => {
                debug!(query, lat = point.lat, lng = point.lng, "geocoded location");
                Some(point)
            }
            Ok(None) => {
                debug!(query, "geocoder returned no result");
                None
            }
            Err(error) => {
                warn!(query, %error, "geocoding failed");
                None
            }
        }
    }
}
