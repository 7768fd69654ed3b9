// src/dag/snapshot.rs

//! Read-only status snapshots handed to reporters and exporters.

use crate::dag::task::{NodeName, TaskId};
use crate::types::{RunStatus, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    pub dependencies: Vec<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub name: NodeName,
    pub status: RunStatus,
    pub tasks: Vec<TaskSnapshot>,
}

impl NodeSnapshot {
    pub fn task(&self, name: &str) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|t| t.id.task == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub name: String,
    /// Scheduling round the snapshot was taken after (`0` before the first).
    pub round: u64,
    pub status: RunStatus,
    pub nodes: Vec<NodeSnapshot>,
}

impl ClusterSnapshot {
    pub fn node(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskSnapshot> {
        self.nodes.iter().flat_map(|n| n.tasks.iter())
    }

    pub fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.node(&id.node)
            .and_then(|n| n.task(&id.task))
            .map(|t| t.status)
    }
}
