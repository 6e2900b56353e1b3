//! Types shared between the cycore library and its binaries.

pub mod errors;

pub use errors::{
    ConfigError, CycoreError, CycoreResult, LaunchError, MaterializeError, PlanError,
};
