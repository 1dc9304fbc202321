//! Drivable-path lookups with a straight-line fallback.
//!
//! A route request is attempted once. Any failure (transport, non-`Ok` OSRM
//! code, empty geometry) degrades to the direct two-point path so a workflow
//! that has already resolved is never held up by the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::GeoPoint;

/// Routing backend returning an ordered list of points from `from` to `to`.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, RoutingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing service error: {0}")]
    Api(String),
    #[error("no route between the requested points")]
    NoRoute,
}

/// Where the points of a [`RoutePlan`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Network,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub points: Vec<GeoPoint>,
    pub source: RouteSource,
}

impl RoutePlan {
    pub fn direct(from: GeoPoint, to: GeoPoint) -> Self {
        Self {
            points: vec![from, to],
            source: RouteSource::Direct,
        }
    }
}

/// Ask the provider for a path, falling back to `[from, to]`.
pub async fn plan_route(provider: &dyn RouteProvider, from: GeoPoint, to: GeoPoint) -> RoutePlan {
    match provider.route(from, to).await {
        Ok(points) if !points.is_empty() => {
            debug!(points = points.len(), "route fetched");
            RoutePlan {
                points,
                source: RouteSource::Network,
            }
        }
        Ok(_) => {
            warn!("routing service returned an empty path; using direct line");
            RoutePlan::direct(from, to)
        }
        Err(error) => {
            warn!(%error, "route fetch failed; using direct line");
            RoutePlan::direct(from, to)
        }
    }
}

/// Provider that never leaves the process; every plan is a direct line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectRouteProvider;

#[async_trait]
impl RouteProvider for DirectRouteProvider {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, RoutingError> {
        Ok(vec![from, to])
    }
}

/// Routes via an OSRM HTTP endpoint.
#[derive(Debug, Clone)]
pub struct OsrmRouteProvider {
    client: Client,
    endpoint: String,
}

impl OsrmRouteProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, from: GeoPoint, to: GeoPoint) -> Result<Url, RoutingError> {
        let base = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.endpoint, from.lng, from.lat, to.lng, to.lat,
        );
        let mut url = Url::parse(&base)
            .map_err(|err| RoutingError::Api(format!("failed to build OSRM URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat]
}

#[async_trait]
impl RouteProvider for OsrmRouteProvider {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, RoutingError> {
        let url = self.route_url(from, to)?;
        let response: OsrmResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_route_response(response)
    }
}

fn parse_route_response(response: OsrmResponse) -> Result<Vec<GeoPoint>, RoutingError> {
    if response.code != "Ok" {
        return Err(RoutingError::Api(
            response.message.unwrap_or(response.code),
        ));
    }

    let route = response.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
    Ok(route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| GeoPoint::new(lat, lng))
        .collect())
}
