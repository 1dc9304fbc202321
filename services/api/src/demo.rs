use crate::infra::{build_dispatch, load_fleet, location_resolver};
use clap::Args;
use fleet_ops::config::AppConfig;
use fleet_ops::error::AppError;
use fleet_ops::fleet::VehicleId;
use fleet_ops::workflows::dispatch::{AssistanceRequest, DispatchService, ReallocationRequest};
use fleet_ops::workflows::matching::{
    match_delivery, Candidate, DeliveryMatch, DeliveryRequest, MatchRequest, MatchingEngine,
};
use fleet_ops::workflows::session::WorkflowSession;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Vehicle whose load needs a new carrier
    #[arg(long)]
    pub(crate) vehicle: String,
    /// Free capacity (percent) a candidate must have
    #[arg(long, default_value_t = 0)]
    pub(crate) required_capacity: u8,
    /// Optional fleet CSV snapshot (defaults to the demo fleet)
    #[arg(long)]
    pub(crate) fleet_csv: Option<PathBuf>,
    /// Print the ranked list as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct MatchDeliveryArgs {
    /// Pickup address or known location name
    #[arg(long)]
    pub(crate) pickup: String,
    /// Dropoff address or known location name
    #[arg(long)]
    pub(crate) dropoff: String,
    #[arg(long, default_value_t = 0)]
    pub(crate) required_capacity: u8,
    #[arg(long)]
    pub(crate) fleet_csv: Option<PathBuf>,
    /// Resolve locations from the built-in table only
    #[arg(long)]
    pub(crate) offline: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional fleet CSV snapshot (defaults to the demo fleet)
    #[arg(long)]
    pub(crate) fleet_csv: Option<PathBuf>,
    /// Skip the routing and geocoding services
    #[arg(long)]
    pub(crate) offline: bool,
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        vehicle,
        required_capacity,
        fleet_csv,
        json,
    } = args;

    let fleet = load_fleet(fleet_csv.as_deref())?;
    let origin = fleet.get(&VehicleId::new(vehicle))?;
    let candidates = MatchingEngine::default().rank(
        &MatchRequest {
            source: origin.position,
            required_capacity,
            origin: Some(origin.id.clone()),
        },
        &fleet.snapshot()?,
    );

    if json {
        match serde_json::to_string_pretty(&candidates) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Ranking unavailable as JSON: {err}"),
        }
        return Ok(());
    }

    println!(
        "Reallocation candidates for {} ({}% capacity required)",
        origin.id, required_capacity
    );
    render_candidates(&candidates);
    Ok(())
}

pub(crate) async fn run_match_delivery(args: MatchDeliveryArgs) -> Result<(), AppError> {
    let MatchDeliveryArgs {
        pickup,
        dropoff,
        required_capacity,
        fleet_csv,
        offline,
    } = args;

    let config = AppConfig::load()?;
    let fleet = load_fleet(fleet_csv.as_deref())?;
    let resolver = location_resolver(&config.geo, offline);

    let request = DeliveryRequest {
        pickup,
        dropoff,
        required_capacity,
        vehicle_type: None,
    };
    let pickup_point = resolver.resolve(&request.pickup).await;
    let dropoff_point = resolver.resolve(&request.dropoff).await;

    println!("Delivery {} -> {}", request.pickup, request.dropoff);
    match pickup_point {
        Some(point) => println!("- pickup resolved to ({:.4}, {:.4})", point.lat, point.lng),
        None => println!("- pickup unresolved"),
    }
    match dropoff_point {
        Some(point) => println!("- dropoff resolved to ({:.4}, {:.4})", point.lat, point.lng),
        None => println!("- dropoff unresolved"),
    }

    match match_delivery(&fleet.snapshot()?, &request, pickup_point) {
        DeliveryMatch::Matched(assignment) => {
            let distance = assignment
                .distance_km
                .map(|km| format!(", {km:.1} km from pickup"))
                .unwrap_or_default();
            println!(
                "Assigned {} via {:?}{}",
                assignment.vehicle_id, assignment.tier, distance
            );
        }
        DeliveryMatch::Unmatched { reason } => println!("No vehicle assigned: {reason}"),
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { fleet_csv, offline } = args;

    let config = AppConfig::load()?;
    let fleet = load_fleet(fleet_csv.as_deref())?;
    let service = build_dispatch(&config, fleet.clone(), offline);

    let summary = fleet.summary()?;
    println!("Fleet dispatch demo");
    println!(
        "- {} vehicles | {} active, {} in maintenance, {} inactive",
        summary.total,
        summary.status.active,
        summary.status.maintenance,
        summary.status.inactive
    );
    println!(
        "- {} delayed | {} awaiting assistance",
        summary.delayed, summary.needs_assistance
    );

    let snapshot = fleet.snapshot()?;
    if let Some(delayed) = snapshot.iter().find(|vehicle| vehicle.is_delayed()) {
        println!("\nReallocation for {} ({})", delayed.id, delayed.name);
        let session = service.start_reallocation(ReallocationRequest {
            vehicle_id: delayed.id.clone(),
            required_capacity: 100 - delayed.free_capacity,
            source: None,
        })?;
        render_candidates(&session.candidates);
        approve_best(&service, &session).await?;
    }

    if let Some(stranded) = snapshot.iter().find(|vehicle| vehicle.needs_assistance()) {
        println!("\nAssistance for {} ({})", stranded.id, stranded.name);
        let session = service.start_assistance(AssistanceRequest {
            vehicle_id: stranded.id.clone(),
        })?;
        render_candidates(&session.candidates);
        approve_best(&service, &session).await?;
    }

    println!("\nDelivery intake");
    let session = service
        .start_delivery(DeliveryRequest {
            pickup: "O'Hare".to_string(),
            dropoff: "Midway".to_string(),
            required_capacity: 20,
            vehicle_type: None,
        })
        .await?;
    match &session.assignment {
        Some(assignment) => {
            println!(
                "- {} matched via {:?}",
                assignment.vehicle_id, assignment.tier
            );
            let resolved = approve_and_wait(&service, &session).await?;
            render_resolution(&resolved);
        }
        None => println!(
            "- no vehicle: {}",
            session.reason.as_deref().unwrap_or("unmatched")
        ),
    }

    Ok(())
}

async fn approve_best(
    service: &Arc<DispatchService>,
    session: &WorkflowSession,
) -> Result<(), AppError> {
    let Some(best) = session.candidates.first() else {
        println!("- nothing to approve");
        return Ok(());
    };
    service.select(&session.id, best.vehicle_id.clone())?;
    println!("- selected {} (score {})", best.vehicle_id, best.score);
    let resolved = approve_and_wait(service, session).await?;
    render_resolution(&resolved);
    Ok(())
}

async fn approve_and_wait(
    service: &Arc<DispatchService>,
    session: &WorkflowSession,
) -> Result<WorkflowSession, AppError> {
    service.approve(&session.id)?;
    println!("- approved {}, processing", session.id);
    Ok(service.wait(&session.id).await?)
}

fn render_candidates(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("- no suitable candidates");
        return;
    }
    for candidate in candidates {
        println!(
            "- {} {} | score {} | {:.1} km | ETA {} min",
            candidate.vehicle_id,
            candidate.vehicle_name,
            candidate.score,
            candidate.distance_km,
            candidate.eta_minutes
        );
    }
}

fn render_resolution(session: &WorkflowSession) {
    let Some(resolution) = &session.resolution else {
        println!("- {} ended without a resolution", session.id);
        return;
    };
    if let Some(error) = &resolution.error {
        println!("- {} resolved with error: {error}", session.id);
        return;
    }
    let points = resolution
        .route
        .as_ref()
        .map(|route| format!("{} route points ({:?})", route.points.len(), route.source))
        .unwrap_or_else(|| "no route".to_string());
    match &resolution.vehicle {
        Some(vehicle) => println!(
            "- {} resolved: {} heading to {} | {}",
            session.id,
            vehicle.id,
            vehicle.destination.as_deref().unwrap_or("-"),
            points
        ),
        None => println!("- {} resolved | {}", session.id, points),
    }
}
