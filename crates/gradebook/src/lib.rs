pub mod bulletins;
pub mod config;
pub mod error;
pub mod telemetry;
