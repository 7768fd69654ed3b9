// src/dag/node.rs

use tracing::{debug, info, warn};

use crate::dag::graph::Graph;
use crate::dag::snapshot::{NodeSnapshot, TaskSnapshot};
use crate::dag::task::{NodeName, Payload, Task, TaskId, TaskName, TaskRef};
use crate::errors::Result;
use crate::types::{RunStatus, TaskOutcome, TaskStatus};

/// Tasks allowed to run at once on a node unless configured otherwise.
pub const DEFAULT_NODE_CONCURRENCY: usize = 1;

/// A deployment target owning one [`Graph`].
#[derive(Debug, Clone)]
pub struct Node {
    name: NodeName,
    graph: Graph,
    /// Simultaneously running tasks allowed here; `0` means unlimited.
    concurrency: usize,
    aborted: bool,
}

impl Node {
    pub fn new(name: impl Into<NodeName>) -> Self {
        let name = name.into();
        Self {
            graph: Graph::new(name.clone()),
            name,
            concurrency: DEFAULT_NODE_CONCURRENCY,
            aborted: false,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.concurrency = concurrency;
    }

    pub fn add_task(&mut self, name: impl Into<TaskName>, payload: Payload) -> Result<&mut Task> {
        self.graph.add_task(name, payload)
    }

    pub fn add_dependency(&mut self, task: &str, depends_on: impl Into<TaskRef>) -> Result<()> {
        self.graph.add_dependency(task, depends_on)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.graph.task(name)
    }

    pub fn running_count(&self) -> usize {
        self.graph.count_with_status(TaskStatus::Running)
    }

    fn has_capacity(&self) -> bool {
        self.concurrency == 0 || self.running_count() < self.concurrency
    }

    /// The first ready task in declaration order, if this node may start
    /// another task.
    pub fn next_task(&self) -> Option<&Task> {
        if self.aborted || !self.has_capacity() {
            return None;
        }
        self.graph
            .tasks()
            .find(|t| t.status() == TaskStatus::Ready)
    }

    /// Mark a ready task as handed to the executor.
    pub fn start(&mut self, task: &str) -> Result<bool> {
        let task = self.graph.expect_task_mut(task)?;
        let started = task.transition(TaskStatus::Running);
        if started {
            info!(task = %task.id(), "task dispatched");
        }
        Ok(started)
    }

    /// Apply an executor report for `task`.
    ///
    /// A failure marks every local dependent `DepFailed` before readiness is
    /// recomputed. Reports for tasks that are not running are ignored and
    /// return `Ok(false)`.
    pub fn report(&mut self, task: &str, outcome: TaskOutcome) -> Result<bool> {
        self.apply_report(task, outcome)
            .map(|changed| !changed.is_empty())
    }

    /// [`Node::report`], returning every task id whose status changed (the
    /// reported task first, then local dependents marked `DepFailed`).
    pub(crate) fn apply_report(&mut self, task: &str, outcome: TaskOutcome) -> Result<Vec<TaskId>> {
        let entry = self.graph.expect_task_mut(task)?;
        let id = entry.id().clone();

        if !entry.transition(outcome.status()) {
            debug!(task = %id, ?outcome, "report did not change task status");
            return Ok(Vec::new());
        }

        let mut changed = vec![id.clone()];
        match outcome {
            TaskOutcome::Success => info!(task = %id, "task successful"),
            TaskOutcome::Failed(code) => {
                warn!(task = %id, exit_code = code, "task failed; failing dependents");
                changed.extend(self.graph.cascade_failure(task));
            }
        }

        self.graph.refresh_local();
        Ok(changed)
    }

    /// Bypass a pending or ready task; dependents treat it as done.
    pub fn skip(&mut self, task: &str) -> Result<bool> {
        let entry = self.graph.expect_task_mut(task)?;
        let skipped = entry.transition(TaskStatus::Skipped);
        if skipped {
            info!(task = %entry.id(), "task skipped");
            self.graph.refresh_local();
        }
        Ok(skipped)
    }

    /// Recompute readiness with local knowledge only.
    pub fn refresh(&mut self) -> Vec<TaskName> {
        self.graph.refresh_local()
    }

    /// Stop handing out tasks; running tasks still accept reports.
    pub fn abort(&mut self) {
        if !self.aborted {
            warn!(node = %self.name, "node aborted; no further tasks will be dispatched");
            self.aborted = true;
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Aggregated status.
    ///
    /// - `Successful`: every task is successful or skipped.
    /// - `Running`: at least one task is running.
    /// - `Failed`: a task failed and nothing is left to run (or the node
    ///   was aborted).
    /// - `Pending`: anything else.
    pub fn status(&self) -> RunStatus {
        let mut all_satisfied = true;
        let mut all_terminal = true;
        let mut any_running = false;
        let mut any_failure = false;

        for task in self.graph.tasks() {
            let status = task.status();
            all_satisfied &= status.satisfies_dependents();
            all_terminal &= status.is_terminal();
            any_running |= status == TaskStatus::Running;
            any_failure |= status.is_failure();
        }

        if all_satisfied {
            RunStatus::Successful
        } else if any_running {
            RunStatus::Running
        } else if (any_failure && all_terminal) || self.aborted {
            RunStatus::Failed
        } else {
            RunStatus::Pending
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            name: self.name.clone(),
            status: self.status(),
            tasks: self
                .graph
                .tasks()
                .map(|t| TaskSnapshot {
                    id: t.id().clone(),
                    status: t.status(),
                    dependencies: t.dependencies().to_vec(),
                })
                .collect(),
        }
    }
}
