use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;

/// One unit of work in an execution plan.
///
/// `Ctx` is cloned into every task; use interior mutability to publish outputs.
#[async_trait]
pub trait PipelineTask<Ctx>: Send + Sync {
    async fn run(self: Box<Self>, ctx: Ctx) -> CycoreResult<()>;

    /// Stable name, used in logs and metrics.
    fn name(&self) -> &'static str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
