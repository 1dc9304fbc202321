use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{ServiceOrder, ServiceOrderRequest, Vehicle, VehicleId};
use super::filter::{FleetFilter, FleetSummary};
use super::store::FleetStore;
use crate::error::AppError;

/// Free-text note attached to delay and assistance reports.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct IncidentReport {
    #[serde(default)]
    pub(crate) note: Option<String>,
}

/// Router builder exposing fleet reads and the direct fleet commands.
pub fn fleet_router(store: Arc<FleetStore>) -> Router {
    Router::new()
        .route("/api/v1/fleet", get(list_handler))
        .route("/api/v1/fleet/summary", get(summary_handler))
        .route("/api/v1/fleet/:vehicle_id", get(vehicle_handler))
        .route(
            "/api/v1/fleet/:vehicle_id/service-orders",
            post(create_service_order_handler).get(service_orders_handler),
        )
        .route(
            "/api/v1/fleet/:vehicle_id/assistance-requests",
            post(assistance_request_handler),
        )
        .route("/api/v1/fleet/:vehicle_id/delays", post(delay_handler))
        .with_state(store)
}

pub(crate) async fn list_handler(
    State(store): State<Arc<FleetStore>>,
    Query(filter): Query<FleetFilter>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    Ok(Json(store.query(&filter)?))
}

pub(crate) async fn summary_handler(
    State(store): State<Arc<FleetStore>>,
) -> Result<Json<FleetSummary>, AppError> {
    Ok(Json(store.summary()?))
}

pub(crate) async fn vehicle_handler(
    State(store): State<Arc<FleetStore>>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(store.get(&VehicleId(vehicle_id))?))
}

pub(crate) async fn create_service_order_handler(
    State(store): State<Arc<FleetStore>>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<ServiceOrderRequest>,
) -> Result<(StatusCode, Json<ServiceOrder>), AppError> {
    let order = store.create_service_order(&VehicleId(vehicle_id), request)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub(crate) async fn service_orders_handler(
    State(store): State<Arc<FleetStore>>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Vec<ServiceOrder>>, AppError> {
    let id = VehicleId(vehicle_id);
    store.get(&id)?;
    Ok(Json(store.service_orders(Some(&id))?))
}

pub(crate) async fn assistance_request_handler(
    State(store): State<Arc<FleetStore>>,
    Path(vehicle_id): Path<String>,
    Json(report): Json<IncidentReport>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(
        store.request_assistance(&VehicleId(vehicle_id), report.note)?,
    ))
}

pub(crate) async fn delay_handler(
    State(store): State<Arc<FleetStore>>,
    Path(vehicle_id): Path<String>,
    Json(report): Json<IncidentReport>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(store.report_delay(&VehicleId(vehicle_id), report.note)?))
}
