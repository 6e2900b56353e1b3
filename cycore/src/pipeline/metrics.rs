use std::time::Duration;

use super::stage::ExecutionMode;

#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: &'static str,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct StageMetrics {
    pub index: usize,
    pub execution: ExecutionMode,
    pub duration: Duration,
    pub tasks: Vec<TaskMetrics>,
}

/// Wall-clock timings of a finished plan.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub total: Duration,
    pub stages: Vec<StageMetrics>,
}

impl PipelineMetrics {
    pub fn task_duration(&self, name: &str) -> Option<Duration> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter())
            .find(|task| task.name == name)
            .map(|task| task.duration)
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter().map(|t| t.name))
            .collect()
    }

    /// One info line per task, then the total.
    pub fn log(&self) {
        for stage in &self.stages {
            for task in &stage.tasks {
                tracing::info!(
                    stage = stage.index,
                    execution = ?stage.execution,
                    task = task.name,
                    duration_ms = task.duration.as_millis() as u64,
                    "Task finished"
                );
            }
        }
        tracing::info!(total_ms = self.total.as_millis() as u64, "Pipeline finished");
    }
}
