use std::time::Instant;

use cycore_shared::errors::CycoreResult;
use futures::future::try_join_all;

use super::metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
use super::stage::{ExecutionMode, Stage};
use super::task::BoxedTask;

/// Ordered list of stages.
pub struct ExecutionPlan<Ctx> {
    stages: Vec<Stage<Ctx>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(stages: Vec<Stage<Ctx>>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage<Ctx>] {
        &self.stages
    }
}

pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run every stage of `plan` against `ctx`.
    ///
    /// Stops at the first failing task and returns its error; tasks of later
    /// stages never start.
    pub async fn execute<Ctx>(plan: ExecutionPlan<Ctx>, ctx: Ctx) -> CycoreResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let started = Instant::now();
        let mut stages = Vec::with_capacity(plan.stages.len());

        for (index, stage) in plan.stages.into_iter().enumerate() {
            let execution = stage.execution;
            let stage_started = Instant::now();
            tracing::debug!(stage = index, tasks = ?stage.task_names(), ?execution, "Starting stage");

            let tasks = match execution {
                ExecutionMode::Parallel => {
                    try_join_all(stage.tasks.into_iter().map(|task| run_task(task, ctx.clone())))
                        .await?
                }
                ExecutionMode::Sequential => {
                    let mut done = Vec::with_capacity(stage.tasks.len());
                    for task in stage.tasks {
                        done.push(run_task(task, ctx.clone()).await?);
                    }
                    done
                }
            };

            stages.push(StageMetrics {
                index,
                execution,
                duration: stage_started.elapsed(),
                tasks,
            });
        }

        Ok(PipelineMetrics {
            total: started.elapsed(),
            stages,
        })
    }
}

async fn run_task<Ctx>(task: BoxedTask<Ctx>, ctx: Ctx) -> CycoreResult<TaskMetrics> {
    let name = task.name();
    let started = Instant::now();
    task.run(ctx).await?;
    Ok(TaskMetrics {
        name,
        duration: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineTask;
    use async_trait::async_trait;
    use cycore_shared::errors::CycoreError;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Record {
        name: &'static str,
        delay_ms: u64,
        fail: bool,
    }

    #[async_trait]
    impl PipelineTask<Log> for Record {
        async fn run(self: Box<Self>, ctx: Log) -> CycoreResult<()> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.fail {
                return Err(CycoreError::Internal(format!("{} failed", self.name)));
            }
            ctx.lock().await.push(self.name);
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn task(name: &'static str, delay_ms: u64, fail: bool) -> BoxedTask<Log> {
        Box::new(Record {
            name,
            delay_ms,
            fail,
        })
    }

    #[tokio::test]
    async fn test_stages_run_in_order_parallel_tasks_overlap() {
        let plan = ExecutionPlan::new(vec![
            Stage::parallel(vec![task("slow", 50, false), task("fast", 0, false)]),
            Stage::single(task("last", 0, false)),
        ]);
        let log: Log = Arc::default();

        let metrics = PipelineExecutor::execute(plan, log.clone()).await.unwrap();

        assert_eq!(*log.lock().await, vec!["fast", "slow", "last"]);
        assert_eq!(metrics.task_names(), vec!["slow", "fast", "last"]);
        assert_eq!(metrics.stages[0].execution, ExecutionMode::Parallel);
        assert!(metrics.task_duration("slow").unwrap() >= Duration::from_millis(50));
        assert!(metrics.task_duration("missing").is_none());
    }

    #[tokio::test]
    async fn test_failure_stops_later_stages() {
        let plan = ExecutionPlan::new(vec![
            Stage::sequential(vec![task("first", 0, false), task("broken", 0, true)]),
            Stage::single(task("never", 0, false)),
        ]);
        let log: Log = Arc::default();

        let err = PipelineExecutor::execute(plan, log.clone()).await.unwrap_err();

        assert_eq!(err.to_string(), "internal error: broken failed");
        assert_eq!(*log.lock().await, vec!["first"]);
    }
}
