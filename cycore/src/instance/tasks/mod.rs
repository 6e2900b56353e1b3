//! Launch pipeline tasks.

mod config_resolve;
mod image_materialize;
mod launch_plan;
mod vm_launch;

pub use config_resolve::ConfigResolveTask;
pub use image_materialize::ImageMaterializeTask;
pub use launch_plan::LaunchPlanTask;
pub use vm_launch::VmLaunchTask;

use std::sync::Arc;

use cycore_shared::errors::CycoreError;
use tokio::sync::Mutex;

use super::types::LaunchPipelineContext;
use crate::runtime::InstanceId;

pub type LaunchCtx = Arc<Mutex<LaunchPipelineContext>>;

/// Log task start and return the instance id for later log lines.
async fn task_start(ctx: &LaunchCtx, task_name: &str) -> InstanceId {
    let instance = ctx.lock().await.options.instance.clone();
    tracing::debug!(instance = %instance, task = task_name, "Task started");
    instance
}

fn log_task_error(instance: &InstanceId, task_name: &str, err: &CycoreError) {
    tracing::error!(instance = %instance, task = task_name, error = %err, "Task failed");
}

fn missing_output(task_name: &str) -> CycoreError {
    CycoreError::Internal(format!("{} task must run first", task_name))
}
