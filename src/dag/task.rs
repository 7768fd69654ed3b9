// src/dag/task.rs

//! Tasks, their identities and their status transitions.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::errors::{FleetError, Result};
use crate::limits::{IntoKey, Key};
use crate::types::TaskStatus;

pub type TaskName = String;
pub type NodeName = String;

/// Opaque data handed to the executor; the scheduler never reads it.
pub type Payload = toml::Table;

/// Fully qualified task identity, rendered as `node/task`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    pub node: NodeName,
    pub task: TaskName,
}

impl TaskId {
    pub fn new(node: impl Into<NodeName>, task: impl Into<TaskName>) -> Self {
        Self {
            node: node.into(),
            task: task.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.task)
    }
}

/// Reference to a predecessor as written by a plan builder.
///
/// `"install"` names a task on the same node, `"db-1/migrate"` a task on
/// another node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskRef {
    Local(TaskName),
    Remote { node: NodeName, task: TaskName },
}

impl TaskRef {
    pub fn remote(node: impl Into<NodeName>, task: impl Into<TaskName>) -> Self {
        TaskRef::Remote {
            node: node.into(),
            task: task.into(),
        }
    }

    /// Qualify against the node that owns the dependent task.
    pub fn resolve(&self, owner: &str) -> TaskId {
        match self {
            TaskRef::Local(task) => TaskId::new(owner, task.clone()),
            TaskRef::Remote { node, task } => TaskId::new(node.clone(), task.clone()),
        }
    }
}

impl FromStr for TaskRef {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            None if !s.is_empty() => Ok(TaskRef::Local(s.to_string())),
            Some((node, task)) if !node.is_empty() && !task.is_empty() && !task.contains('/') => {
                Ok(TaskRef::remote(node, task))
            }
            _ => Err(FleetError::InvalidArgument(format!(
                "invalid task reference '{s}' (expected \"task\" or \"node/task\")"
            ))),
        }
    }
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        TaskRef::Local(name.to_string())
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        TaskRef::Local(name)
    }
}

impl From<TaskId> for TaskRef {
    fn from(id: TaskId) -> Self {
        TaskRef::Remote {
            node: id.node,
            task: id.task,
        }
    }
}

impl From<&TaskId> for TaskRef {
    fn from(id: &TaskId) -> Self {
        TaskRef::from(id.clone())
    }
}

/// One unit of deployment work owned by a node.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    payload: Payload,
    status: TaskStatus,
    /// Predecessors: must be successful or skipped before this task runs.
    dependencies: Vec<TaskId>,
    /// Counters that must admit this task before it is dispatched.
    counters: Vec<Key>,
}

impl Task {
    pub fn new(node: impl Into<NodeName>, name: impl Into<TaskName>, payload: Payload) -> Self {
        Self {
            id: TaskId::new(node, name),
            payload,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            counters: Vec::new(),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.task
    }

    pub fn node(&self) -> &str {
        &self.id.node
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }

    pub fn counters(&self) -> &[Key] {
        &self.counters
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Require admission by the counter named `key` before dispatch.
    pub fn add_counter(&mut self, key: impl IntoKey) -> Result<()> {
        let key = key.into_key()?;
        if !self.counters.contains(&key) {
            self.counters.push(key);
        }
        Ok(())
    }

    /// Returns `false` if the edge was already present.
    pub(crate) fn add_dependency(&mut self, predecessor: TaskId) -> bool {
        if self.dependencies.contains(&predecessor) {
            return false;
        }
        self.dependencies.push(predecessor);
        true
    }

    /// Apply a status transition.
    ///
    /// Returns `true` if the status changed. Transitions out of a terminal
    /// status are ignored, so duplicate reports are harmless.
    pub fn transition(&mut self, next: TaskStatus) -> bool {
        if self.status.allows(next) {
            trace!(task = %self.id, from = %self.status, to = %next, "task transition");
            self.status = next;
            true
        } else {
            if self.status.is_terminal() {
                debug!(
                    task = %self.id,
                    status = %self.status,
                    requested = %next,
                    "ignoring transition on terminal task"
                );
            } else if self.status != next {
                debug!(
                    task = %self.id,
                    status = %self.status,
                    requested = %next,
                    "transition not allowed; ignoring"
                );
            }
            false
        }
    }
}
