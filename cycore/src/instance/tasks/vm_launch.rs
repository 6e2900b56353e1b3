//! Task: run the sandbox and wait for the VM to exit.

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;

use super::{LaunchCtx, log_task_error, missing_output, task_start};
use crate::launch::LaunchExecutor;
use crate::pipeline::PipelineTask;

pub struct VmLaunchTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for VmLaunchTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> CycoreResult<()> {
        let task_name = self.name();
        let instance = task_start(&ctx, task_name).await;

        // The lock is not held while the VM runs.
        let (plan, stdio) = {
            let ctx = ctx.lock().await;
            let plan = ctx
                .plan_output
                .clone()
                .ok_or_else(|| missing_output("launch_plan"))?;
            (plan, ctx.options.stdio)
        };

        let status = LaunchExecutor::new(stdio)
            .execute(plan)
            .await
            .inspect_err(|e| log_task_error(&instance, task_name, e))?;

        ctx.lock().await.exit_status = Some(status);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "vm_launch"
    }
}
