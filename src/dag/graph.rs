// src/dag/graph.rs

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::dag::task::{NodeName, Payload, Task, TaskId, TaskName, TaskRef};
use crate::errors::{FleetError, Result};
use crate::types::TaskStatus;

/// Status of any task by identity; `None` if the task is unknown here.
pub trait StatusLookup {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus>;
}

/// Edge structure of the tasks reachable from a graph.
pub trait DependencyLookup {
    fn contains_task(&self, id: &TaskId) -> bool;

    /// Tasks that list `id` as a predecessor, in declaration order.
    fn dependents_of(&self, id: &TaskId) -> Vec<TaskId>;
}

/// Plain status table, used to look across nodes while one node is being
/// mutated.
pub type StatusIndex = HashMap<TaskId, TaskStatus>;

impl StatusLookup for StatusIndex {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.get(id).copied()
    }
}

/// The tasks owned by one node plus their dependency edges.
///
/// Edges may point at tasks on other nodes; those are resolved through a
/// [`StatusLookup`] / [`DependencyLookup`] supplied by the caller. A graph
/// used on its own treats foreign predecessors as never satisfied.
#[derive(Debug, Clone)]
pub struct Graph {
    node: NodeName,
    /// Declaration order; scheduling ties break on it.
    tasks: Vec<Task>,
    index: HashMap<TaskName, usize>,
}

impl Graph {
    pub fn new(node: impl Into<NodeName>) -> Self {
        Self {
            node: node.into(),
            tasks: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn task_mut(&mut self, name: &str) -> Option<&mut Task> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.tasks[i]),
            None => None,
        }
    }

    pub(crate) fn expect_task_mut(&mut self, name: &str) -> Result<&mut Task> {
        let node = self.node.clone();
        self.task_mut(name)
            .ok_or_else(|| FleetError::NoSuchTask(TaskId::new(node, name).to_string()))
    }

    /// Register a new task under `name`.
    pub fn add_task(&mut self, name: impl Into<TaskName>, payload: Payload) -> Result<&mut Task> {
        let task = Task::new(self.node.clone(), name, payload);
        self.insert_task(task)
    }

    /// Register a pre-built task; it must belong to this graph's node.
    pub fn insert_task(&mut self, task: Task) -> Result<&mut Task> {
        if task.node() != self.node {
            return Err(FleetError::InvalidArgument(format!(
                "task '{}' belongs to node '{}', not '{}'",
                task.name(),
                task.node(),
                self.node
            )));
        }
        if task.name().is_empty() {
            return Err(FleetError::InvalidArgument(format!(
                "task names on node '{}' must not be empty",
                self.node
            )));
        }
        if self.index.contains_key(task.name()) {
            return Err(FleetError::InvalidArgument(format!(
                "task '{}' is already defined",
                task.id()
            )));
        }

        let position = self.tasks.len();
        self.index.insert(task.name().to_string(), position);
        self.tasks.push(task);
        Ok(&mut self.tasks[position])
    }

    /// Record that `task` must wait for `depends_on`.
    ///
    /// `task` must already exist; the predecessor is only resolved by
    /// [`Graph::validate`], so it may be added later or live on another
    /// node.
    pub fn add_dependency(&mut self, task: &str, depends_on: impl Into<TaskRef>) -> Result<()> {
        let predecessor = depends_on.into().resolve(&self.node);
        let dependent = self.expect_task_mut(task)?;
        if dependent.add_dependency(predecessor.clone()) {
            debug!(task = %dependent.id(), after = %predecessor, "dependency added");
        }
        Ok(())
    }

    /// Local tasks that list `name` as a predecessor.
    pub fn dependents_of(&self, name: &str) -> Vec<&Task> {
        let id = TaskId::new(self.node.clone(), name);
        self.tasks
            .iter()
            .filter(|t| t.dependencies().contains(&id))
            .collect()
    }

    /// Validate this graph on its own: every predecessor must be a local
    /// task and the local edges must be acyclic.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(self)
    }

    /// Validate against a wider view that also knows other nodes' tasks.
    ///
    /// Cycles are searched depth-first along dependent edges starting at
    /// each local task; the first repeated task on the active path ends
    /// the search with [`FleetError::LoopDetected`].
    pub fn validate_with(&self, lookup: &dyn DependencyLookup) -> Result<()> {
        for task in &self.tasks {
            for dep in task.dependencies() {
                let known = if dep.node == self.node {
                    self.index.contains_key(&dep.task)
                } else {
                    lookup.contains_task(dep)
                };
                if !known {
                    return Err(FleetError::NoSuchTask(format!(
                        "{dep} (required by {})",
                        task.id()
                    )));
                }
            }
        }

        self.detect_loop(lookup)
    }

    fn detect_loop(&self, lookup: &dyn DependencyLookup) -> Result<()> {
        let mut finished: HashSet<TaskId> = HashSet::new();

        for task in &self.tasks {
            if finished.contains(task.id()) {
                continue;
            }

            let mut path: Vec<TaskId> = vec![task.id().clone()];
            let mut pending = vec![lookup.dependents_of(task.id()).into_iter()];

            while let Some(frame) = pending.last_mut() {
                match frame.next() {
                    Some(next) => {
                        if let Some(start) = path.iter().position(|id| *id == next) {
                            let mut cycle = path[start..].to_vec();
                            cycle.push(next);
                            return Err(FleetError::LoopDetected { path: cycle });
                        }
                        if finished.contains(&next) {
                            continue;
                        }
                        pending.push(lookup.dependents_of(&next).into_iter());
                        path.push(next);
                    }
                    None => {
                        pending.pop();
                        if let Some(done) = path.pop() {
                            finished.insert(done);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Whether every predecessor of `task` is successful or skipped.
    pub fn dependencies_satisfied(&self, task: &Task, external: &dyn StatusLookup) -> bool {
        task.dependencies().iter().all(|dep| {
            let status = if dep.node == self.node {
                self.task(&dep.task).map(Task::status)
            } else {
                external.status_of(dep)
            };
            status.is_some_and(TaskStatus::satisfies_dependents)
        })
    }

    /// Tasks eligible to run right now, computed fresh on every call.
    pub fn ready_tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.ready_tasks_with(self)
    }

    /// Like [`Graph::ready_tasks`], resolving foreign predecessors through
    /// `external`.
    pub fn ready_tasks_with<'a>(
        &'a self,
        external: &'a dyn StatusLookup,
    ) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |task| {
            matches!(task.status(), TaskStatus::Pending | TaskStatus::Ready)
                && self.dependencies_satisfied(task, external)
        })
    }

    /// Promote every pending task whose predecessors are done to `Ready`.
    ///
    /// Returns the names of the newly ready tasks.
    pub fn refresh_readiness(&mut self, external: &dyn StatusLookup) -> Vec<TaskName> {
        let promote: Vec<TaskName> = self
            .ready_tasks_with(external)
            .filter(|t| t.status() == TaskStatus::Pending)
            .map(|t| t.name().to_string())
            .collect();

        for name in &promote {
            if let Some(task) = self.task_mut(name) {
                task.transition(TaskStatus::Ready);
                debug!(task = %task.id(), "dependencies satisfied; task is ready");
            }
        }

        promote
    }

    /// Same as [`Graph::refresh_readiness`] with only local knowledge.
    pub fn refresh_local(&mut self) -> Vec<TaskName> {
        let snapshot = self.status_index();
        self.refresh_readiness(&snapshot)
    }

    /// Mark every non-terminal local task depending (transitively) on
    /// `failed` as `DepFailed`.
    ///
    /// The walk continues through tasks that are already terminal, so a
    /// skipped intermediate does not shield its dependents. Returns the ids
    /// that changed; the caller continues the cascade into other nodes.
    pub fn cascade_failure(&mut self, failed: &str) -> Vec<TaskId> {
        let mut queue: VecDeque<TaskName> = VecDeque::from([failed.to_string()]);
        let mut visited: HashSet<TaskName> = HashSet::from([failed.to_string()]);
        let mut changed = Vec::new();

        while let Some(name) = queue.pop_front() {
            let dependents: Vec<TaskName> = self
                .dependents_of(&name)
                .into_iter()
                .map(|t| t.name().to_string())
                .collect();

            for dependent in dependents {
                if !visited.insert(dependent.clone()) {
                    continue;
                }
                if let Some(task) = self.task_mut(&dependent) {
                    if task.transition(TaskStatus::DepFailed) {
                        debug!(
                            task = %task.id(),
                            upstream = %name,
                            "marking dependent as dep_failed"
                        );
                        changed.push(task.id().clone());
                    }
                }
                queue.push_back(dependent);
            }
        }

        changed
    }

    pub fn status_index(&self) -> StatusIndex {
        self.tasks
            .iter()
            .map(|t| (t.id().clone(), t.status()))
            .collect()
    }

    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status() == status).count()
    }
}

impl StatusLookup for Graph {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        if id.node != self.node {
            return None;
        }
        self.task(&id.task).map(Task::status)
    }
}

impl DependencyLookup for Graph {
    fn contains_task(&self, id: &TaskId) -> bool {
        id.node == self.node && self.index.contains_key(&id.task)
    }

    fn dependents_of(&self, id: &TaskId) -> Vec<TaskId> {
        if id.node != self.node {
            return Vec::new();
        }
        Graph::dependents_of(self, &id.task)
            .into_iter()
            .map(|t| t.id().clone())
            .collect()
    }
}
