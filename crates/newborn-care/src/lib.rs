pub mod clinical;
pub mod config;
pub mod error;
pub mod telemetry;
