use super::task::BoxedTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All tasks polled concurrently; the stage ends when every task has.
    Parallel,
    /// Tasks run one after another in declaration order.
    Sequential,
}

/// Tasks that start together, plus how to run them.
pub struct Stage<Ctx> {
    pub tasks: Vec<BoxedTask<Ctx>>,
    pub execution: ExecutionMode,
}

impl<Ctx> Stage<Ctx> {
    pub fn parallel(tasks: Vec<BoxedTask<Ctx>>) -> Self {
        Self {
            tasks,
            execution: ExecutionMode::Parallel,
        }
    }

    pub fn sequential(tasks: Vec<BoxedTask<Ctx>>) -> Self {
        Self {
            tasks,
            execution: ExecutionMode::Sequential,
        }
    }

    /// Shorthand for a sequential stage holding one task.
    pub fn single(task: BoxedTask<Ctx>) -> Self {
        Self::sequential(vec![task])
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}
