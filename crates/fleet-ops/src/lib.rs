//! Fleet dispatch core: trip lifecycle, resource eligibility, and incident-driven
//! driver safety scoring.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
