pub mod config;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod telemetry;
pub mod workflows;
