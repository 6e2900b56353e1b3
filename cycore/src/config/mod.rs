//! Per-instance launch configuration.

mod resolver;

pub use resolver::{ConfigResolver, instance_key};

use serde::{Deserialize, Serialize};

/// Launch parameters for one VM, exactly as stored in the coordination service.
///
/// Values are only checked for presence here; format checks happen when a
/// launch plan is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Memory size token passed to `-m` (e.g. `4096`, `4G`).
    pub ram: String,
    pub mac: String,
    /// RBD image spec (`pool/image`).
    pub block_device: String,
    pub spice_port: String,
}
