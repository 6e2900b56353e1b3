//! Shared state of the launch pipeline.

use std::process::ExitStatus;
use std::sync::Arc;

use crate::config::LaunchConfig;
use crate::coordination::KeyValueStore;
use crate::images::ContainerEngine;
use crate::launch::LaunchPlan;
use crate::rootfs::MaterializedImage;
use crate::runtime::CycoreOptions;

/// Inputs plus the output slot of every task.
///
/// Each task takes what it needs under the lock, releases it for the actual
/// work, then stores its output.
pub struct LaunchPipelineContext {
    pub options: CycoreOptions,
    pub store: Arc<dyn KeyValueStore>,
    pub engine: Arc<dyn ContainerEngine>,
    pub config_output: Option<LaunchConfig>,
    pub rootfs_output: Option<MaterializedImage>,
    pub plan_output: Option<LaunchPlan>,
    pub exit_status: Option<ExitStatus>,
}

impl LaunchPipelineContext {
    pub fn new(
        options: CycoreOptions,
        store: Arc<dyn KeyValueStore>,
        engine: Arc<dyn ContainerEngine>,
    ) -> Self {
        Self {
            options,
            store,
            engine,
            config_output: None,
            rootfs_output: None,
            plan_output: None,
            exit_status: None,
        }
    }
}
