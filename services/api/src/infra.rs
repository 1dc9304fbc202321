use fleet_ops::config::{AppConfig, GeoConfig};
use fleet_ops::error::AppError;
use fleet_ops::fleet::{demo_fleet, FleetCsvImporter, FleetStore};
use fleet_ops::geo::{
    DirectRouteProvider, Geocoder, KnownLocations, LocationResolver, NominatimGeocoder,
    OsrmRouteProvider, RouteProvider,
};
use fleet_ops::workflows::dispatch::DispatchService;
use fleet_ops::workflows::matching::MatchingEngine;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Fleet from a CSV snapshot when one is given, otherwise the demo fleet.
pub(crate) fn load_fleet(snapshot: Option<&Path>) -> Result<Arc<FleetStore>, AppError> {
    let vehicles = match snapshot {
        Some(path) => {
            let vehicles = FleetCsvImporter::from_path(path)?;
            info!(path = %path.display(), vehicles = vehicles.len(), "fleet snapshot imported");
            vehicles
        }
        None => demo_fleet(),
    };
    Ok(Arc::new(FleetStore::new(vehicles)?))
}

pub(crate) fn route_provider(geo: &GeoConfig, offline: bool) -> Arc<dyn RouteProvider> {
    if offline {
        return Arc::new(DirectRouteProvider);
    }
    match OsrmRouteProvider::new(&geo.routing_endpoint, geo.http_timeout) {
        Ok(provider) => Arc::new(provider),
        Err(error) => {
            warn!(%error, "routing client unavailable; routes will be direct lines");
            Arc::new(DirectRouteProvider)
        }
    }
}

pub(crate) fn location_resolver(geo: &GeoConfig, offline: bool) -> LocationResolver {
    let known = KnownLocations::standard();
    if offline {
        return LocationResolver::offline(known);
    }
    match NominatimGeocoder::new(&geo.geocoder_endpoint, geo.http_timeout) {
        Ok(geocoder) => {
            let geocoder: Arc<dyn Geocoder> = Arc::new(geocoder);
            LocationResolver::new(known, Some(geocoder), geo.geocoder_city.clone())
        }
        Err(error) => {
            warn!(%error, "geocoder unavailable; only known locations resolve");
            LocationResolver::offline(known)
        }
    }
}

pub(crate) fn build_dispatch(
    config: &AppConfig,
    fleet: Arc<FleetStore>,
    offline: bool,
) -> Arc<DispatchService> {
    Arc::new(DispatchService::new(
        fleet,
        MatchingEngine::default(),
        route_provider(&config.geo, offline),
        location_resolver(&config.geo, offline),
        config.session,
    ))
}
