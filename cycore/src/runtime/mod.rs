//! Launcher configuration and shared runtime types.

pub mod constants;
pub mod options;
pub mod types;

pub use options::CycoreOptions;
pub use types::InstanceId;
