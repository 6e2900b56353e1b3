//! Task: pull the QEMU image and extract it into the target path.

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;

use super::{LaunchCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use crate::rootfs::{ImageMaterializer, MaterializeOptions};

pub struct ImageMaterializeTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for ImageMaterializeTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> CycoreResult<()> {
        let task_name = self.name();
        let instance = task_start(&ctx, task_name).await;

        let (engine, image, target, options) = {
            let ctx = ctx.lock().await;
            (
                ctx.engine.clone(),
                ctx.options.image.clone(),
                ctx.options.target_path.clone(),
                MaterializeOptions::from(&ctx.options),
            )
        };

        let materialized = ImageMaterializer::new(engine, options)
            .materialize(&image, &target)
            .await
            .inspect_err(|e| log_task_error(&instance, task_name, e))?;

        if let Some(warning) = &materialized.cleanup_warning {
            tracing::warn!(instance = %instance, "Rootfs ready with cleanup warning: {}", warning);
        }

        ctx.lock().await.rootfs_output = Some(materialized);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "image_materialize"
    }
}
