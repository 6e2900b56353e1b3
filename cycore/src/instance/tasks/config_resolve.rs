//! Task: resolve the instance's launch config from the coordination service.

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;

use super::{LaunchCtx, log_task_error, task_start};
use crate::config::ConfigResolver;
use crate::pipeline::PipelineTask;

pub struct ConfigResolveTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for ConfigResolveTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> CycoreResult<()> {
        let task_name = self.name();
        let instance = task_start(&ctx, task_name).await;

        let (store, domain) = {
            let ctx = ctx.lock().await;
            (ctx.store.clone(), ctx.options.key_domain.clone())
        };

        let config = ConfigResolver::new(store, domain)
            .resolve(&instance)
            .await
            .inspect_err(|e| log_task_error(&instance, task_name, e))?;

        ctx.lock().await.config_output = Some(config);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "config_resolve"
    }
}
