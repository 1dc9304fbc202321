use crate::config::ConfigError;
use crate::fleet::{FleetError, FleetImportError};
use crate::telemetry::TelemetryError;
use crate::workflows::dispatch::DispatchError;
use crate::workflows::session::SessionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(FleetImportError),
    Fleet(FleetError),
    Dispatch(DispatchError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Fleet(err) => fleet_status(err),
            AppError::Dispatch(err) => dispatch_status(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn fleet_status(err: &FleetError) -> StatusCode {
    match err {
        FleetError::VehicleNotFound(_) => StatusCode::NOT_FOUND,
        FleetError::DuplicateVehicle(_)
        | FleetError::NoAssistanceRequested(_)
        | FleetError::NotDelayed(_)
        | FleetError::OutOfService(_)
        | FleetError::InsufficientCapacity { .. } => StatusCode::CONFLICT,
        FleetError::SelfAssignment(_) | FleetError::BlankIssue => StatusCode::UNPROCESSABLE_ENTITY,
        FleetError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn dispatch_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Fleet(err) => fleet_status(err),
        DispatchError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::VehicleBusy { .. } | DispatchError::ResolutionPending(_) => {
            StatusCode::CONFLICT
        }
        DispatchError::Session(err) => match err {
            SessionError::UnknownCandidate { .. } | SessionError::InvalidIncrement(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SessionError::NotPending { .. }
            | SessionError::NotProcessing { .. }
            | SessionError::NoSelection(_)
            | SessionError::Closed(_) => StatusCode::CONFLICT,
        },
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "fleet import error: {}", err),
            AppError::Fleet(err) => write!(f, "{}", err),
            AppError::Dispatch(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Fleet(err) => Some(err),
            AppError::Dispatch(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<FleetImportError> for AppError {
    fn from(value: FleetImportError) -> Self {
        Self::Import(value)
    }
}

impl From<FleetError> for AppError {
    fn from(value: FleetError) -> Self {
        Self::Fleet(value)
    }
}

impl From<DispatchError> for AppError {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(value)
    }
}
