use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SessionConfig;
use crate::fleet::{demo_fleet, FleetStore, VehicleId};
use crate::geo::{GeoPoint, KnownLocations, LocationResolver, RouteProvider, RoutingError};
use crate::workflows::dispatch::DispatchService;
use crate::workflows::matching::MatchingEngine;

pub(super) fn id(value: &str) -> VehicleId {
    VehicleId::new(value)
}

pub(super) fn fast_sessions() -> SessionConfig {
    SessionConfig {
        tick_interval: Duration::from_millis(50),
        progress_increment: 25,
    }
}

pub(super) fn build_service(routes: Arc<dyn RouteProvider>) -> Arc<DispatchService> {
    let fleet = Arc::new(FleetStore::new(demo_fleet()).expect("demo fleet is valid"));
    Arc::new(DispatchService::new(
        fleet,
        MatchingEngine::default(),
        routes,
        LocationResolver::offline(KnownLocations::standard()),
        fast_sessions(),
    ))
}

/// Returns a three-point path through the midpoint and counts calls.
#[derive(Default)]
pub(super) struct MidpointRoutes {
    calls: AtomicUsize,
}

impl MidpointRoutes {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteProvider for MidpointRoutes {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mid = GeoPoint::new((from.lat + to.lat) / 2.0, (from.lng + to.lng) / 2.0);
        Ok(vec![from, mid, to])
    }
}

/// Simulated network failure on every call.
pub(super) struct UnreachableRoutes;

#[async_trait]
impl RouteProvider for UnreachableRoutes {
    async fn route(&self, _from: GeoPoint, _to: GeoPoint) -> Result<Vec<GeoPoint>, RoutingError> {
        Err(RoutingError::Api("connection refused".to_string()))
    }
}

/// Answers only after five seconds, holding a resolution in flight.
pub(super) struct SlowRoutes;

#[async_trait]
impl RouteProvider for SlowRoutes {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, RoutingError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![from, to])
    }
}
