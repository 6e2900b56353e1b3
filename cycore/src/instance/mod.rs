//! Instance launch orchestration.
//!
//! ## Architecture
//!
//! ```text
//!   1. ConfigResolve    ─┬─  (read /<domain>/<instance>/* from etcd)
//!      ImageMaterialize ─┘   (pull → export ══→ tar -x into target)
//!   2. LaunchPlan            (validate + build nspawn command line)
//!   3. VmLaunch              (run nspawn, wait for exit; skipped on dry run)
//! ```
//!
//! Stage 2 only starts after both stage 1 tasks succeeded, so the planner
//! never sees a half-extracted root filesystem.

mod tasks;
mod types;

use std::process::ExitStatus;
use std::sync::Arc;

use cycore_shared::errors::{CycoreError, CycoreResult};
use tokio::sync::Mutex;

use crate::coordination::{EtcdStore, KeyValueStore};
use crate::images::{CliEngine, ContainerEngine};
use crate::launch::LaunchPlan;
use crate::pipeline::{ExecutionPlan, PipelineExecutor, PipelineMetrics, Stage};
use crate::rootfs::MaterializedImage;
use crate::runtime::CycoreOptions;

use tasks::{ConfigResolveTask, ImageMaterializeTask, LaunchCtx, LaunchPlanTask, VmLaunchTask};
use types::LaunchPipelineContext;

fn get_execution_plan(dry_run: bool) -> ExecutionPlan<LaunchCtx> {
    let mut stages: Vec<Stage<LaunchCtx>> = vec![
        Stage::parallel(vec![
            Box::new(ConfigResolveTask),
            Box::new(ImageMaterializeTask),
        ]),
        Stage::single(Box::new(LaunchPlanTask)),
    ];
    if !dry_run {
        stages.push(Stage::single(Box::new(VmLaunchTask)));
    }
    ExecutionPlan::new(stages)
}

/// Result of a completed run.
#[derive(Debug)]
pub struct LaunchOutcome {
    pub rootfs: MaterializedImage,
    pub plan: LaunchPlan,
    /// `None` on a dry run.
    pub exit_status: Option<ExitStatus>,
    pub metrics: PipelineMetrics,
}

/// Materializes the rootfs and launches one instance.
///
/// # Example
///
/// ```ignore
/// let outcome = InstanceLauncher::from_options(CycoreOptions::new("vm42"))?
///     .launch()
///     .await?;
/// ```
pub struct InstanceLauncher {
    options: CycoreOptions,
    store: Arc<dyn KeyValueStore>,
    engine: Arc<dyn ContainerEngine>,
}

impl InstanceLauncher {
    /// Use the given collaborators instead of etcd and the engine CLI.
    pub fn new(
        options: CycoreOptions,
        store: Arc<dyn KeyValueStore>,
        engine: Arc<dyn ContainerEngine>,
    ) -> CycoreResult<Self> {
        options.sanitize()?;
        Ok(Self {
            options,
            store,
            engine,
        })
    }

    /// Wire up `EtcdStore` and `CliEngine` from the options.
    pub fn from_options(options: CycoreOptions) -> CycoreResult<Self> {
        let store = Arc::new(EtcdStore::new(options.etcd_endpoints.clone())?);
        let engine = Arc::new(CliEngine::new(options.engine_binary.clone()));
        Self::new(options, store, engine)
    }

    pub fn options(&self) -> &CycoreOptions {
        &self.options
    }

    pub async fn launch(self) -> CycoreResult<LaunchOutcome> {
        let InstanceLauncher {
            options,
            store,
            engine,
        } = self;

        tracing::info!(
            instance = %options.instance,
            image = %options.image,
            target = %options.target_path.display(),
            dry_run = options.dry_run,
            "Launching instance"
        );

        let plan = get_execution_plan(options.dry_run);
        let ctx: LaunchCtx = Arc::new(Mutex::new(LaunchPipelineContext::new(
            options, store, engine,
        )));

        let metrics = PipelineExecutor::execute(plan, Arc::clone(&ctx)).await?;
        metrics.log();

        let mut ctx = ctx.lock().await;
        let rootfs = ctx
            .rootfs_output
            .take()
            .ok_or_else(|| CycoreError::Internal("image_materialize task must run first".into()))?;
        let plan = ctx
            .plan_output
            .take()
            .ok_or_else(|| CycoreError::Internal("launch_plan task must run first".into()))?;

        Ok(LaunchOutcome {
            rootfs,
            plan,
            exit_status: ctx.exit_status.take(),
            metrics,
        })
    }
}
