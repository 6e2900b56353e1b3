//! Turning a ready root filesystem and instance config into a running sandbox.
//!
//! - `LaunchPlanner` - validates inputs, builds the `LaunchPlan` (no side effects)
//! - `LaunchExecutor` - runs the plan and waits for exit

mod executor;
mod plan;
mod policy;
mod validate;

pub use executor::{LaunchExecutor, StdioMode, exit_code};
pub use plan::{LaunchPlan, LaunchPlanner};
pub use policy::{BindMount, SandboxPolicy};
pub use validate::validate_bridge;
