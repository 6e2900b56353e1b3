//! Task: build the sandbox command line from config and rootfs.

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;

use super::{LaunchCtx, log_task_error, missing_output, task_start};
use crate::launch::LaunchPlanner;
use crate::pipeline::PipelineTask;

pub struct LaunchPlanTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for LaunchPlanTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> CycoreResult<()> {
        let task_name = self.name();
        let instance = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let config = ctx
            .config_output
            .as_ref()
            .ok_or_else(|| missing_output("config_resolve"))?;
        let image = ctx
            .rootfs_output
            .as_ref()
            .ok_or_else(|| missing_output("image_materialize"))?;

        let planner = LaunchPlanner::new(
            ctx.options.policy.clone(),
            ctx.options.bridge_interface.clone(),
        );
        let plan = planner
            .plan(image, config)
            .inspect_err(|e| log_task_error(&instance, task_name, e))?;

        tracing::info!(instance = %instance, command = %plan, "Launch plan ready");
        ctx.plan_output = Some(plan);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "launch_plan"
    }
}
