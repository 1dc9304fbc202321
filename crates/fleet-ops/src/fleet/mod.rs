//! Fleet records and the single store that owns them.

pub mod domain;
pub mod filter;
pub mod import;
mod router;
pub mod seed;
pub mod store;

pub use domain::{
    AssistanceDispatch, AssistanceInfo, DelayInfo, DispatchStatus, HealthStatus,
    OperationalStatus, ServiceOrder, ServiceOrderRequest, ServicePriority, Vehicle, VehicleId,
};
pub use filter::{FleetFilter, FleetSummary, HealthCounts, StatusCounts};
pub use import::{FleetCsvImporter, FleetImportError};
pub use router::fleet_router;
pub use seed::demo_fleet;
pub use store::{ensure_can_carry, FleetError, FleetStore};
