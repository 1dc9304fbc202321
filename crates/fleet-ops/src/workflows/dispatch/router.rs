use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::domain::{AssistanceRequest, ReallocationRequest, SelectRequest};
use super::service::DispatchService;
use crate::error::AppError;
use crate::workflows::matching::DeliveryRequest;
use crate::workflows::session::{SessionId, WorkflowSession};

type SessionResponse = Result<(StatusCode, Json<WorkflowSession>), AppError>;

/// Router builder exposing the workflow session endpoints.
pub fn dispatch_router(service: Arc<DispatchService>) -> Router {
    Router::new()
        .route("/api/v1/workflows", get(list_handler))
        .route(
            "/api/v1/workflows/reallocations",
            post(reallocation_handler),
        )
        .route("/api/v1/workflows/assistance", post(assistance_handler))
        .route("/api/v1/workflows/deliveries", post(delivery_handler))
        .route(
            "/api/v1/workflows/:session_id",
            get(session_handler).delete(abandon_handler),
        )
        .route("/api/v1/workflows/:session_id/select", post(select_handler))
        .route(
            "/api/v1/workflows/:session_id/approve",
            post(approve_handler),
        )
        .route("/api/v1/workflows/:session_id/deny", post(deny_handler))
        .with_state(service)
}

pub(crate) async fn list_handler(
    State(service): State<Arc<DispatchService>>,
) -> Json<Vec<WorkflowSession>> {
    Json(service.sessions())
}

pub(crate) async fn reallocation_handler(
    State(service): State<Arc<DispatchService>>,
    Json(request): Json<ReallocationRequest>,
) -> SessionResponse {
    let session = service.start_reallocation(request)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub(crate) async fn assistance_handler(
    State(service): State<Arc<DispatchService>>,
    Json(request): Json<AssistanceRequest>,
) -> SessionResponse {
    let session = service.start_assistance(request)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub(crate) async fn delivery_handler(
    State(service): State<Arc<DispatchService>>,
    Json(request): Json<DeliveryRequest>,
) -> SessionResponse {
    let session = service.start_delivery(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub(crate) async fn session_handler(
    State(service): State<Arc<DispatchService>>,
    Path(session_id): Path<String>,
) -> SessionResponse {
    let session = service.get(&SessionId(session_id))?;
    Ok((StatusCode::OK, Json(session)))
}

pub(crate) async fn select_handler(
    State(service): State<Arc<DispatchService>>,
    Path(session_id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> SessionResponse {
    let session = service.select(&SessionId(session_id), request.vehicle_id)?;
    Ok((StatusCode::OK, Json(session)))
}

pub(crate) async fn approve_handler(
    State(service): State<Arc<DispatchService>>,
    Path(session_id): Path<String>,
) -> SessionResponse {
    let session = service.approve(&SessionId(session_id))?;
    Ok((StatusCode::ACCEPTED, Json(session)))
}

pub(crate) async fn deny_handler(
    State(service): State<Arc<DispatchService>>,
    Path(session_id): Path<String>,
) -> SessionResponse {
    let session = service.deny(&SessionId(session_id))?;
    Ok((StatusCode::OK, Json(session)))
}

pub(crate) async fn abandon_handler(
    State(service): State<Arc<DispatchService>>,
    Path(session_id): Path<String>,
) -> SessionResponse {
    let session = service.abandon(&SessionId(session_id))?;
    Ok((StatusCode::OK, Json(session)))
}
