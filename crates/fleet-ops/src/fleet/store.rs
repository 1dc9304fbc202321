use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::info;

use super::domain::{
    AssistanceDispatch, AssistanceInfo, DelayInfo, DispatchStatus, OperationalStatus,
    ServiceOrder, ServiceOrderRequest, Vehicle, VehicleId,
};
use super::filter::{FleetFilter, FleetSummary};
use crate::geo::GeoPoint;

/// Error enumeration for fleet store commands.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),
    #[error("vehicle {0} already exists")]
    DuplicateVehicle(VehicleId),
    #[error("vehicle {0} has no open assistance request")]
    NoAssistanceRequested(VehicleId),
    #[error("vehicle {0} has no delayed shipment to reallocate")]
    NotDelayed(VehicleId),
    #[error("vehicle {0} is out of service")]
    OutOfService(VehicleId),
    #[error("vehicle {vehicle} has {available}% free capacity, {required}% required")]
    InsufficientCapacity {
        vehicle: VehicleId,
        required: u8,
        available: u8,
    },
    #[error("vehicle {0} cannot respond to its own assistance request")]
    SelfAssignment(VehicleId),
    #[error("service order issue must not be blank")]
    BlankIssue,
    #[error("fleet store lock poisoned")]
    Poisoned,
}

/// Owned fleet snapshot. Readers get clones; every mutation goes through one
/// of the command methods and holds the write lock for its whole duration.
#[derive(Debug)]
pub struct FleetStore {
    vehicles: RwLock<Vec<Vehicle>>,
    service_orders: RwLock<Vec<ServiceOrder>>,
    order_sequence: AtomicU64,
}

impl FleetStore {
    pub fn new(vehicles: Vec<Vehicle>) -> Result<Self, FleetError> {
        let mut seen = std::collections::HashSet::new();
        for vehicle in &vehicles {
            if !seen.insert(vehicle.id.clone()) {
                return Err(FleetError::DuplicateVehicle(vehicle.id.clone()));
            }
        }

        Ok(Self {
            vehicles: RwLock::new(vehicles),
            service_orders: RwLock::new(Vec::new()),
            order_sequence: AtomicU64::new(1),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Vehicle>>, FleetError> {
        self.vehicles.read().map_err(|_| FleetError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Vehicle>>, FleetError> {
        self.vehicles.write().map_err(|_| FleetError::Poisoned)
    }

    /// Every vehicle in fleet order.
    pub fn snapshot(&self) -> Result<Vec<Vehicle>, FleetError> {
        Ok(self.read()?.clone())
    }

    pub fn get(&self, id: &VehicleId) -> Result<Vehicle, FleetError> {
        self.read()?
            .iter()
            .find(|vehicle| &vehicle.id == id)
            .cloned()
            .ok_or_else(|| FleetError::VehicleNotFound(id.clone()))
    }

    pub fn query(&self, filter: &FleetFilter) -> Result<Vec<Vehicle>, FleetError> {
        Ok(self
            .read()?
            .iter()
            .filter(|vehicle| filter.matches(vehicle))
            .cloned()
            .collect())
    }

    pub fn summary(&self) -> Result<FleetSummary, FleetError> {
        Ok(FleetSummary::from_vehicles(self.read()?.iter()))
    }

    pub fn report_delay(
        &self,
        id: &VehicleId,
        reason: Option<String>,
    ) -> Result<Vehicle, FleetError> {
        let mut vehicles = self.write()?;
        let vehicle = find_mut(&mut vehicles, id)?;
        vehicle.delay = Some(DelayInfo { reason });
        Ok(vehicle.clone())
    }

    pub fn request_assistance(
        &self,
        id: &VehicleId,
        issue: Option<String>,
    ) -> Result<Vehicle, FleetError> {
        let mut vehicles = self.write()?;
        let vehicle = find_mut(&mut vehicles, id)?;
        vehicle.assistance = Some(AssistanceInfo {
            issue,
            dispatch: AssistanceDispatch::Requested,
            responder: None,
        });
        info!(vehicle = %id, "assistance requested");
        Ok(vehicle.clone())
    }

    /// Assign a responder to a stranded vehicle.
    pub fn dispatch_assistance(
        &self,
        id: &VehicleId,
        responder: &VehicleId,
    ) -> Result<Vehicle, FleetError> {
        if id == responder {
            return Err(FleetError::SelfAssignment(id.clone()));
        }

        let mut vehicles = self.write()?;
        let target_location = {
            let vehicle = find_mut(&mut vehicles, id)?;
            if !vehicle.needs_assistance() {
                return Err(FleetError::NoAssistanceRequested(id.clone()));
            }
            vehicle.location_name.clone()
        };
        // Validate the responder before touching the stranded record.
        find_mut(&mut vehicles, responder)?;

        let vehicle = find_mut(&mut vehicles, id)?;
        if let Some(assistance) = vehicle.assistance.as_mut() {
            assistance.dispatch = AssistanceDispatch::Dispatched;
            assistance.responder = Some(responder.clone());
        }
        let updated = vehicle.clone();

        let unit = find_mut(&mut vehicles, responder)?;
        unit.dispatch_status = DispatchStatus::EnRoute;
        unit.destination = Some(target_location);

        info!(vehicle = %id, responder = %responder, "assistance dispatched");
        Ok(updated)
    }

    /// Close an assistance request and record the responder's path.
    pub fn complete_assistance(
        &self,
        id: &VehicleId,
        route: Vec<GeoPoint>,
    ) -> Result<Vehicle, FleetError> {
        let mut vehicles = self.write()?;
        let responder = {
            let vehicle = find_mut(&mut vehicles, id)?;
            let assistance = vehicle
                .assistance
                .as_mut()
                .ok_or_else(|| FleetError::NoAssistanceRequested(id.clone()))?;
            assistance.dispatch = AssistanceDispatch::Completed;
            assistance.responder.clone()
        };

        if let Some(responder) = responder {
            let unit = find_mut(&mut vehicles, &responder)?;
            unit.route = route;
        }

        Ok(find_mut(&mut vehicles, id)?.clone())
    }

    /// Move a delayed shipment onto `target`. The source's delay is cleared and
    /// the target takes over its destination, path and load.
    pub fn approve_reallocation(
        &self,
        source: &VehicleId,
        target: &VehicleId,
        required_capacity: u8,
        route: Vec<GeoPoint>,
    ) -> Result<Vehicle, FleetError> {
        if source == target {
            return Err(FleetError::SelfAssignment(source.clone()));
        }

        let mut vehicles = self.write()?;
        ensure_can_carry(find_mut(&mut vehicles, target)?, required_capacity)?;

        let destination = {
            let origin = find_mut(&mut vehicles, source)?;
            origin.delay = None;
            origin
                .destination
                .clone()
                .unwrap_or_else(|| origin.location_name.clone())
        };

        let unit = find_mut(&mut vehicles, target)?;
        unit.free_capacity -= required_capacity;
        unit.dispatch_status = DispatchStatus::EnRoute;
        unit.destination = Some(destination);
        unit.route = route;

        info!(source = %source, target = %target, "reallocation applied");
        Ok(unit.clone())
    }

    /// Raise a work order and take the vehicle out of service.
    pub fn create_service_order(
        &self,
        id: &VehicleId,
        request: ServiceOrderRequest,
    ) -> Result<ServiceOrder, FleetError> {
        let issue = request.issue.trim().to_string();
        if issue.is_empty() {
            return Err(FleetError::BlankIssue);
        }

        let mut vehicles = self.write()?;
        let vehicle = find_mut(&mut vehicles, id)?;
        vehicle.status = OperationalStatus::Maintenance;
        vehicle.dispatch_status = DispatchStatus::Maintenance;

        let sequence = self.order_sequence.fetch_add(1, Ordering::Relaxed);
        let order = ServiceOrder {
            id: format!("SO-{sequence:06}"),
            vehicle_id: id.clone(),
            issue,
            priority: request.priority,
            created_at: Utc::now(),
        };

        self.service_orders
            .write()
            .map_err(|_| FleetError::Poisoned)?
            .push(order.clone());

        info!(vehicle = %id, order = %order.id, "service order created");
        Ok(order)
    }

    pub fn service_orders(
        &self,
        id: Option<&VehicleId>,
    ) -> Result<Vec<ServiceOrder>, FleetError> {
        let orders = self
            .service_orders
            .read()
            .map_err(|_| FleetError::Poisoned)?;
        Ok(orders
            .iter()
            .filter(|order| id.map_or(true, |id| &order.vehicle_id == id))
            .cloned()
            .collect())
    }

    /// Attach a new delivery leg to the assigned vehicle.
    pub fn merge_delivery_route(
        &self,
        id: &VehicleId,
        dropoff: &str,
        required_capacity: u8,
        route: Vec<GeoPoint>,
    ) -> Result<Vehicle, FleetError> {
        let mut vehicles = self.write()?;
        let vehicle = find_mut(&mut vehicles, id)?;
        ensure_can_carry(vehicle, required_capacity)?;
        vehicle.free_capacity -= required_capacity;
        vehicle.dispatch_status = DispatchStatus::EnRoute;
        vehicle.destination = Some(dropoff.to_string());
        vehicle.route = route;
        Ok(vehicle.clone())
    }
}

/// A load may only go onto an active vehicle with at least that much room.
pub fn ensure_can_carry(vehicle: &Vehicle, required_capacity: u8) -> Result<(), FleetError> {
    if !vehicle.is_active() {
        return Err(FleetError::OutOfService(vehicle.id.clone()));
    }
    if !vehicle.has_capacity_for(required_capacity) {
        return Err(FleetError::InsufficientCapacity {
            vehicle: vehicle.id.clone(),
            required: required_capacity,
            available: vehicle.free_capacity,
        });
    }
    Ok(())
}

fn find_mut<'a>(
    vehicles: &'a mut [Vehicle],
    id: &VehicleId,
) -> Result<&'a mut Vehicle, FleetError> {
    vehicles
        .iter_mut()
        .find(|vehicle| &vehicle.id == id)
        .ok_or_else(|| FleetError::VehicleNotFound(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::domain::{HealthStatus, ServicePriority};
    use crate::fleet::seed::demo_fleet;

    fn store() -> FleetStore {
        FleetStore::new(demo_fleet()).expect("demo fleet is valid")
    }

    fn id(value: &str) -> VehicleId {
        VehicleId::new(value)
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut fleet = demo_fleet();
        fleet.push(fleet[0].clone());
        assert!(matches!(
            FleetStore::new(fleet),
            Err(FleetError::DuplicateVehicle(_))
        ));
    }

    #[test]
    fn snapshot_preserves_fleet_order() {
        let ids: Vec<_> = store()
            .snapshot()
            .expect("snapshot")
            .into_iter()
            .map(|vehicle| vehicle.id.0)
            .collect();
        assert_eq!(ids.first().map(String::as_str), Some("TRK-101"));
        assert_eq!(ids.last().map(String::as_str), Some("TRK-108"));
    }

    #[test]
    fn service_order_moves_vehicle_to_maintenance() {
        let store = store();
        let order = store
            .create_service_order(
                &id("TRK-102"),
                ServiceOrderRequest {
                    issue: "  Brake pad wear ".to_string(),
                    priority: ServicePriority::Urgent,
                },
            )
            .expect("order created");

        assert_eq!(order.id, "SO-000001");
        assert_eq!(order.issue, "Brake pad wear");
        let vehicle = store.get(&id("TRK-102")).expect("vehicle");
        assert_eq!(vehicle.status, OperationalStatus::Maintenance);
        assert_eq!(vehicle.dispatch_status, DispatchStatus::Maintenance);
        assert_eq!(store.service_orders(Some(&id("TRK-102"))).unwrap().len(), 1);
        assert!(store.service_orders(Some(&id("TRK-101"))).unwrap().is_empty());
    }

    #[test]
    fn blank_service_order_is_rejected_without_mutation() {
        let store = store();
        let result = store.create_service_order(
            &id("TRK-101"),
            ServiceOrderRequest {
                issue: "   ".to_string(),
                priority: ServicePriority::Low,
            },
        );
        assert!(matches!(result, Err(FleetError::BlankIssue)));
        assert_eq!(
            store.get(&id("TRK-101")).unwrap().status,
            OperationalStatus::Active
        );
    }

    #[test]
    fn reallocation_clears_delay_and_loads_target() {
        let store = store();
        let route = vec![GeoPoint::new(41.5, -88.0), GeoPoint::new(41.8, -87.6)];
        let target = store
            .approve_reallocation(&id("TRK-104"), &id("TRK-101"), 50, route.clone())
            .expect("reallocation applied");

        assert_eq!(target.free_capacity, 30);
        assert_eq!(target.dispatch_status, DispatchStatus::EnRoute);
        assert_eq!(
            target.destination.as_deref(),
            Some("Downtown Distribution Center")
        );
        assert_eq!(target.route, route);
        assert!(!store.get(&id("TRK-104")).unwrap().is_delayed());
    }

    #[test]
    fn reallocation_to_unknown_target_leaves_source_delayed() {
        let store = store();
        let result = store.approve_reallocation(&id("TRK-104"), &id("TRK-999"), 10, Vec::new());
        assert!(matches!(result, Err(FleetError::VehicleNotFound(_))));
        assert!(store.get(&id("TRK-104")).unwrap().is_delayed());
    }

    #[test]
    fn reallocation_beyond_free_capacity_is_rejected_untouched() {
        let store = store();
        let result = store.approve_reallocation(&id("TRK-104"), &id("TRK-107"), 50, Vec::new());

        match result {
            Err(FleetError::InsufficientCapacity {
                vehicle,
                required,
                available,
            }) => {
                assert_eq!(vehicle, id("TRK-107"));
                assert_eq!(required, 50);
                assert_eq!(available, 30);
            }
            other => panic!("expected capacity shortfall, got {other:?}"),
        }
        assert_eq!(store.get(&id("TRK-107")).unwrap().free_capacity, 30);
        assert!(store.get(&id("TRK-104")).unwrap().is_delayed());
    }

    #[test]
    fn delivery_leg_needs_an_active_vehicle_with_room() {
        let store = store();
        assert!(matches!(
            store.merge_delivery_route(&id("TRK-102"), "Midway", 60, Vec::new()),
            Err(FleetError::InsufficientCapacity { .. })
        ));
        assert!(matches!(
            store.merge_delivery_route(&id("TRK-105"), "Midway", 10, Vec::new()),
            Err(FleetError::OutOfService(_))
        ));
        let untouched = store.get(&id("TRK-102")).unwrap();
        assert_eq!(untouched.free_capacity, 45);
        assert!(untouched.destination.is_none());
    }

    #[test]
    fn assistance_lifecycle_records_responder_route() {
        let store = store();
        let dispatched = store
            .dispatch_assistance(&id("TRK-107"), &id("TRK-101"))
            .expect("dispatched");
        let info = dispatched.assistance.expect("assistance info");
        assert_eq!(info.dispatch, AssistanceDispatch::Dispatched);
        assert_eq!(info.responder, Some(id("TRK-101")));
        assert_eq!(
            store.get(&id("TRK-101")).unwrap().destination.as_deref(),
            Some("Gary Steel Terminal")
        );

        let route = vec![GeoPoint::new(41.87, -87.63), GeoPoint::new(41.59, -87.35)];
        let completed = store
            .complete_assistance(&id("TRK-107"), route.clone())
            .expect("completed");
        assert!(!completed.needs_assistance());
        assert_eq!(store.get(&id("TRK-101")).unwrap().route, route);
    }

    #[test]
    fn dispatch_requires_an_open_request() {
        let store = store();
        assert!(matches!(
            store.dispatch_assistance(&id("TRK-102"), &id("TRK-101")),
            Err(FleetError::NoAssistanceRequested(_))
        ));
        assert!(matches!(
            store.dispatch_assistance(&id("TRK-107"), &id("TRK-107")),
            Err(FleetError::SelfAssignment(_))
        ));
    }

    #[test]
    fn query_and_summary_follow_mutations() {
        let store = store();
        store
            .report_delay(&id("TRK-106"), Some("Weigh station queue".to_string()))
            .expect("delay recorded");
        let delayed = store
            .query(&FleetFilter {
                delayed: Some(true),
                ..FleetFilter::default()
            })
            .expect("query");
        assert_eq!(delayed.len(), 2);
        assert_eq!(store.summary().unwrap().delayed, 2);

        let critical = store
            .query(&FleetFilter {
                health: Some(HealthStatus::Critical),
                ..FleetFilter::default()
            })
            .expect("query");
        assert_eq!(critical.len(), 1);
    }

    #[test]
    fn delivery_route_merges_onto_vehicle() {
        let store = store();
        let route = vec![GeoPoint::new(41.97, -87.90), GeoPoint::new(41.88, -87.63)];
        let vehicle = store
            .merge_delivery_route(&id("TRK-106"), "The Loop", 40, route.clone())
            .expect("merged");
        assert_eq!(vehicle.free_capacity, 55);
        assert_eq!(vehicle.destination.as_deref(), Some("The Loop"));
        assert_eq!(vehicle.route, route);
    }
}
