//! Staged task execution.
//!
//! ```text
//! ExecutionPlan → Stage (parallel | sequential) → Task
//! ```
//!
//! Stages run in order. Tasks inside a parallel stage run concurrently on the
//! current task (`try_join_all`), so the first failure cancels its siblings
//! and aborts the plan. Tasks share a cloned context and publish outputs
//! through it.

mod executor;
mod metrics;
mod stage;
mod task;

pub use executor::{ExecutionPlan, PipelineExecutor};
pub use metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
pub use stage::{ExecutionMode, Stage};
pub use task::{BoxedTask, PipelineTask};
