//! cycore: run a QEMU VM inside a systemd-nspawn sandbox whose root
//! filesystem comes from a container image and whose per-instance settings
//! come from etcd.
//!
//! ```text
//! etcd ──→ ConfigResolver ───┐
//!                            ├──→ LaunchPlanner ──→ LaunchExecutor ──→ exit status
//! registry ──→ ImageMaterializer ┘
//! ```

pub mod config;
pub mod coordination;
pub mod images;
pub mod instance;
pub mod launch;
pub mod logging;
pub mod pipeline;
pub mod rootfs;
pub mod runtime;

pub use config::{ConfigResolver, LaunchConfig};
pub use coordination::{EtcdStore, KeyValueStore, StaticStore};
pub use images::{CliEngine, ContainerEngine, ExportSink, ImageRef};
pub use instance::{InstanceLauncher, LaunchOutcome};
pub use launch::{
    BindMount, LaunchExecutor, LaunchPlan, LaunchPlanner, SandboxPolicy, StdioMode, exit_code,
};
pub use logging::init_logging;
pub use rootfs::{ImageMaterializer, MaterializeOptions, MaterializedImage};
pub use runtime::{CycoreOptions, InstanceId};

pub use cycore_shared::errors::{
    ConfigError, CycoreError, CycoreResult, LaunchError, MaterializeError, PlanError,
};
