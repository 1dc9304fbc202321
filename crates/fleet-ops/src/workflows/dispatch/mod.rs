//! Workflow orchestration over the fleet store.
//!
//! The dispatch service opens sessions from ranked candidates, guards the
//! one-processing-session-per-vehicle rule, runs the progress ticker, and on
//! resolution fetches a route and applies the outcome to the fleet.

mod domain;
mod router;
mod service;

pub use domain::{AssistanceRequest, ReallocationRequest, SelectRequest};
pub use router::dispatch_router;
pub use service::{DispatchError, DispatchService};

#[cfg(test)]
mod tests;
