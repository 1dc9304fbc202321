use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::fleet::{
    AssistanceDispatch, DispatchStatus, FleetError, ServiceOrderRequest, ServicePriority,
};
use crate::geo::{DirectRouteProvider, RouteSource};
use crate::workflows::dispatch::{AssistanceRequest, DispatchError, ReallocationRequest};
use crate::workflows::matching::{DeliveryRequest, MatchTier};
use crate::workflows::session::{SessionError, SessionPhase, WorkflowKind};

fn reallocate(vehicle: &str, required_capacity: u8) -> ReallocationRequest {
    ReallocationRequest {
        vehicle_id: id(vehicle),
        required_capacity,
        source: None,
    }
}

#[tokio::test(start_paused = true)]
async fn reallocation_resolves_and_moves_the_load() {
    let routes = Arc::new(MidpointRoutes::default());
    let service = build_service(routes.clone());

    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    assert_eq!(session.kind, WorkflowKind::Reallocation);
    assert!(session.found);
    assert!(session
        .candidates
        .iter()
        .all(|candidate| candidate.vehicle_id != id("TRK-104")));

    service
        .select(&session.id, id("TRK-106"))
        .expect("candidate selectable");
    let approved = service.approve(&session.id).expect("approve");
    assert_eq!(approved.phase, SessionPhase::Processing { progress: 0 });

    let resolved = service.wait(&session.id).await.expect("session resolves");
    assert_eq!(resolved.phase, SessionPhase::Resolved);
    let resolution = resolved.resolution.expect("resolution recorded");
    assert!(resolution.error.is_none());
    let route = resolution.route.expect("route planned");
    assert_eq!(route.source, RouteSource::Network);
    assert_eq!(route.points.len(), 3);
    assert_eq!(routes.calls(), 1);

    let fleet = service.fleet();
    let origin = fleet.get(&id("TRK-104")).expect("origin");
    assert!(!origin.is_delayed());
    let target = fleet.get(&id("TRK-106")).expect("target");
    assert_eq!(target.free_capacity, 75);
    assert_eq!(target.dispatch_status, DispatchStatus::EnRoute);
    assert_eq!(
        target.destination.as_deref(),
        Some("Downtown Distribution Center")
    );
    assert_eq!(target.route.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn routing_failure_falls_back_to_direct_line() {
    let service = build_service(Arc::new(UnreachableRoutes));
    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    service
        .select(&session.id, id("TRK-101"))
        .expect("select");
    service.approve(&session.id).expect("approve");

    let resolved = service.wait(&session.id).await.expect("session resolves");

    let resolution = resolved.resolution.expect("resolution recorded");
    assert!(resolution.error.is_none());
    let route = resolution.route.expect("route planned");
    assert_eq!(route.source, RouteSource::Direct);
    let origin = service.fleet().get(&id("TRK-104")).expect("origin");
    let target = service.fleet().get(&id("TRK-101")).expect("target");
    assert_eq!(route.points, vec![origin.position, target.position]);
    assert_eq!(target.route, route.points);
}

#[tokio::test(start_paused = true)]
async fn capacity_gate_leaves_only_trucks_with_room() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let session = service
        .start_reallocation(reallocate("TRK-104", 99))
        .expect("session opens");

    // Only the out-of-service trucks have room; they still score on distance.
    let ids: Vec<_> = session
        .candidates
        .iter()
        .map(|candidate| candidate.vehicle_id.as_str())
        .collect();
    assert_eq!(ids, vec!["TRK-105", "TRK-108"]);
    assert!(session.candidates.iter().all(|c| c.status_score == 0));
}

#[tokio::test(start_paused = true)]
async fn vehicle_can_only_be_processing_in_one_session() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let first = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("first session");
    service
        .fleet()
        .report_delay(&id("TRK-103"), None)
        .expect("delay reported");
    let second = service
        .start_reallocation(reallocate("TRK-103", 20))
        .expect("second session");

    service.select(&first.id, id("TRK-106")).expect("select");
    service.select(&second.id, id("TRK-106")).expect("select");
    service.approve(&first.id).expect("first approval");

    match service.approve(&second.id) {
        Err(DispatchError::VehicleBusy { vehicle, session }) => {
            assert_eq!(vehicle, id("TRK-106"));
            assert_eq!(session, first.id);
        }
        other => panic!("expected busy vehicle, got {other:?}"),
    }
    let still_pending = service.get(&second.id).expect("second session");
    assert_eq!(still_pending.phase, SessionPhase::Pending);

    service.wait(&first.id).await.expect("first resolves");
    service
        .approve(&second.id)
        .expect("vehicle free after resolution");
}

#[tokio::test(start_paused = true)]
async fn approval_rechecks_room_left_by_an_earlier_session() {
    let service = build_service(Arc::new(DirectRouteProvider));
    service
        .fleet()
        .report_delay(&id("TRK-103"), None)
        .expect("delay reported");
    let first = service
        .start_reallocation(reallocate("TRK-104", 50))
        .expect("first session");
    let second = service
        .start_reallocation(reallocate("TRK-103", 50))
        .expect("second session");
    service.select(&first.id, id("TRK-101")).expect("select");
    service.select(&second.id, id("TRK-101")).expect("select");

    service.approve(&first.id).expect("first approval");
    service.wait(&first.id).await.expect("first resolves");
    assert_eq!(
        service.fleet().get(&id("TRK-101")).expect("target").free_capacity,
        30
    );

    match service.approve(&second.id) {
        Err(DispatchError::Fleet(FleetError::InsufficientCapacity {
            vehicle,
            required,
            available,
        })) => {
            assert_eq!(vehicle, id("TRK-101"));
            assert_eq!(required, 50);
            assert_eq!(available, 30);
        }
        other => panic!("expected insufficient capacity, got {other:?}"),
    }
    let waiting = service.get(&second.id).expect("second session");
    assert_eq!(waiting.phase, SessionPhase::Pending);
    assert_eq!(waiting.selected, Some(id("TRK-101")));
    let target = service.fleet().get(&id("TRK-101")).expect("target");
    assert_eq!(target.free_capacity, 30);
    assert!(service.fleet().get(&id("TRK-103")).expect("origin").is_delayed());
}

#[tokio::test(start_paused = true)]
async fn approval_rejects_a_candidate_taken_out_of_service() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    service.select(&session.id, id("TRK-106")).expect("select");
    service
        .fleet()
        .create_service_order(
            &id("TRK-106"),
            ServiceOrderRequest {
                issue: "Coolant leak".to_string(),
                priority: ServicePriority::Urgent,
            },
        )
        .expect("service order");

    match service.approve(&session.id) {
        Err(DispatchError::Fleet(FleetError::OutOfService(vehicle))) => {
            assert_eq!(vehicle, id("TRK-106"));
        }
        other => panic!("expected out of service, got {other:?}"),
    }
    assert_eq!(
        service.get(&session.id).expect("session").phase,
        SessionPhase::Pending
    );
}

#[tokio::test(start_paused = true)]
async fn settling_session_keeps_its_vehicles_and_cannot_be_abandoned() {
    let service = build_service(Arc::new(SlowRoutes));
    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    service.select(&session.id, id("TRK-106")).expect("select");
    service.approve(&session.id).expect("approve");

    tokio::time::sleep(Duration::from_millis(260)).await;
    let settling = service.get(&session.id).expect("session");
    assert_eq!(settling.phase, SessionPhase::Resolved);
    assert!(settling.resolution.is_none());

    match service.abandon(&session.id) {
        Err(DispatchError::ResolutionPending(pending)) => assert_eq!(pending, session.id),
        other => panic!("expected pending resolution, got {other:?}"),
    }

    let rival = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("rival session");
    service.select(&rival.id, id("TRK-106")).expect("select");
    match service.approve(&rival.id) {
        Err(DispatchError::VehicleBusy { session: holder, .. }) => {
            assert_eq!(holder, session.id)
        }
        other => panic!("expected busy vehicle, got {other:?}"),
    }

    let resolved = service.wait(&session.id).await.expect("session resolves");
    let resolution = resolved.resolution.expect("resolution recorded");
    assert!(resolution.error.is_none());
    assert!(!service.fleet().get(&id("TRK-104")).expect("origin").is_delayed());
    let target = service.fleet().get(&id("TRK-106")).expect("target");
    assert_eq!(target.free_capacity, 75);

    service.abandon(&session.id).expect("settled session closes");
}

#[tokio::test(start_paused = true)]
async fn only_delayed_vehicles_open_a_reallocation() {
    let service = build_service(Arc::new(DirectRouteProvider));
    match service.start_reallocation(reallocate("TRK-101", 20)) {
        Err(DispatchError::Fleet(FleetError::NotDelayed(vehicle))) => {
            assert_eq!(vehicle, id("TRK-101"));
        }
        other => panic!("expected on-time vehicle to be refused, got {other:?}"),
    }
    assert!(service.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn origin_vehicle_is_guarded_too() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let first = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("first session");
    let second = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("second session");

    service.select(&first.id, id("TRK-101")).expect("select");
    service.select(&second.id, id("TRK-106")).expect("select");
    service.approve(&first.id).expect("first approval");

    assert!(matches!(
        service.approve(&second.id),
        Err(DispatchError::VehicleBusy { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn deny_keeps_session_pending_without_selection() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    service.select(&session.id, id("TRK-101")).expect("select");

    let denied = service.deny(&session.id).expect("deny");
    assert_eq!(denied.phase, SessionPhase::Pending);
    assert!(denied.selected.is_none());

    match service.approve(&session.id) {
        Err(DispatchError::Session(SessionError::NoSelection(_))) => {}
        other => panic!("expected missing selection, got {other:?}"),
    }
    let untouched = service.fleet().get(&id("TRK-101")).expect("vehicle");
    assert_eq!(untouched.dispatch_status, DispatchStatus::Available);
}

#[tokio::test(start_paused = true)]
async fn approving_twice_is_an_invalid_transition() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    service.select(&session.id, id("TRK-101")).expect("select");
    service.approve(&session.id).expect("approve");

    assert!(matches!(
        service.approve(&session.id),
        Err(DispatchError::Session(SessionError::NotPending { .. }))
    ));
    assert!(matches!(
        service.select(&session.id, id("TRK-106")),
        Err(DispatchError::Session(SessionError::NotPending { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn abandoning_a_processing_session_cancels_the_ticker() {
    let routes = Arc::new(MidpointRoutes::default());
    let service = build_service(routes.clone());
    let session = service
        .start_reallocation(reallocate("TRK-104", 20))
        .expect("session opens");
    service.select(&session.id, id("TRK-106")).expect("select");
    service.approve(&session.id).expect("approve");

    tokio::time::sleep(Duration::from_millis(120)).await;
    let abandoned = service.abandon(&session.id).expect("abandon");
    assert!(abandoned.is_processing());
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(matches!(
        service.get(&session.id),
        Err(DispatchError::SessionNotFound(_))
    ));
    assert_eq!(routes.calls(), 0);
    let target = service.fleet().get(&id("TRK-106")).expect("target");
    assert_eq!(target.dispatch_status, DispatchStatus::Available);
    assert!(target.route.is_empty());
    assert!(service.fleet().get(&id("TRK-104")).expect("origin").is_delayed());
}

#[tokio::test(start_paused = true)]
async fn assistance_dispatches_on_approval_and_completes_on_resolution() {
    let service = build_service(Arc::new(MidpointRoutes::default()));
    let session = service
        .start_assistance(AssistanceRequest {
            vehicle_id: id("TRK-107"),
        })
        .expect("session opens");
    assert_eq!(session.kind, WorkflowKind::AssistanceDispatch);
    assert!(session.found);

    service.select(&session.id, id("TRK-101")).expect("select");
    service.approve(&session.id).expect("approve");

    let stranded = service.fleet().get(&id("TRK-107")).expect("stranded");
    let assistance = stranded.assistance.expect("assistance info");
    assert_eq!(assistance.dispatch, AssistanceDispatch::Dispatched);
    assert_eq!(assistance.responder, Some(id("TRK-101")));
    let responder = service.fleet().get(&id("TRK-101")).expect("responder");
    assert_eq!(responder.dispatch_status, DispatchStatus::EnRoute);
    assert_eq!(responder.destination.as_deref(), Some("Gary Steel Terminal"));

    service.wait(&session.id).await.expect("session resolves");

    let stranded = service.fleet().get(&id("TRK-107")).expect("stranded");
    assert_eq!(
        stranded.assistance.expect("assistance info").dispatch,
        AssistanceDispatch::Completed
    );
    let responder = service.fleet().get(&id("TRK-101")).expect("responder");
    assert_eq!(responder.route.len(), 3);
    assert_eq!(responder.route.last(), Some(&stranded.position));
}

#[tokio::test(start_paused = true)]
async fn assistance_requires_an_open_request() {
    let service = build_service(Arc::new(DirectRouteProvider));
    match service.start_assistance(AssistanceRequest {
        vehicle_id: id("TRK-101"),
    }) {
        Err(DispatchError::Fleet(FleetError::NoAssistanceRequested(vehicle))) => {
            assert_eq!(vehicle, id("TRK-101"));
        }
        other => panic!("expected missing assistance request, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn unknown_vehicle_is_not_found() {
    let service = build_service(Arc::new(DirectRouteProvider));
    assert!(matches!(
        service.start_reallocation(reallocate("TRK-999", 10)),
        Err(DispatchError::Fleet(FleetError::VehicleNotFound(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn delivery_with_known_pickup_uses_nearest_vehicle() {
    let service = build_service(Arc::new(MidpointRoutes::default()));
    let session = service
        .start_delivery(DeliveryRequest {
            pickup: "O'Hare cargo apron".to_string(),
            dropoff: "Midway".to_string(),
            required_capacity: 20,
            vehicle_type: None,
        })
        .await
        .expect("session opens");

    let assignment = session.assignment.clone().expect("matched");
    assert_eq!(assignment.tier, MatchTier::Nearest);
    assert_eq!(assignment.vehicle_id, id("TRK-102"));
    assert_eq!(session.selected, Some(id("TRK-102")));

    service.approve(&session.id).expect("approve");
    let resolved = service.wait(&session.id).await.expect("session resolves");
    assert!(resolved.resolution.expect("resolution").error.is_none());

    let vehicle = service.fleet().get(&id("TRK-102")).expect("vehicle");
    assert_eq!(vehicle.destination.as_deref(), Some("Midway"));
    assert_eq!(vehicle.free_capacity, 25);
    assert_eq!(vehicle.route.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn unresolvable_delivery_falls_back_to_first_active_vehicle() {
    let service = build_service(Arc::new(DirectRouteProvider));
    let request = DeliveryRequest {
        pickup: "Springfield warehouse".to_string(),
        dropoff: "Peoria".to_string(),
        required_capacity: 40,
        vehicle_type: Some("box_truck".to_string()),
    };

    let first = service
        .start_delivery(request.clone())
        .await
        .expect("session opens");
    let second = service.start_delivery(request).await.expect("session opens");

    let assignment = first.assignment.clone().expect("matched");
    assert_eq!(assignment.tier, MatchTier::FirstActive);
    assert_eq!(assignment.vehicle_id, id("TRK-101"));
    assert_eq!(second.assignment, first.assignment);

    service.approve(&first.id).expect("approve");
    let resolved = service.wait(&first.id).await.expect("session resolves");
    let resolution = resolved.resolution.expect("resolution");
    assert!(resolution.route.is_none());
    let vehicle = service.fleet().get(&id("TRK-101")).expect("vehicle");
    assert_eq!(vehicle.destination.as_deref(), Some("Peoria"));
}
